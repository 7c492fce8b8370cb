//! Solver configuration
//!
//! [`Options`] is a plain typed record with preset constructors and `with_*`
//! builders. The string-keyed interface used by front ends goes through
//! [`OptionKind`] and [`OptionValue`]; every write is validated by
//! [`Options::set`]. Options that may only change before the first term is
//! built are enforced by the solver, which knows whether terms exist.

use oxbit_core::{OxbitError, Result};
use std::fmt;

/// Decision procedure used by `check_sat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineKind {
    /// Bit-blasting to SAT with lazy array and function handling
    #[default]
    Fun,
    /// Word-level propagation-based local search
    Prop,
    /// Bit-level local search over the and-inverter graph
    AigProp,
    /// Counterexample-guided quantifier instantiation
    Quant,
    /// Score-based stochastic local search
    Sls,
}

impl EngineKind {
    /// Option string of this engine
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Fun => "fun",
            EngineKind::Prop => "prop",
            EngineKind::AigProp => "aigprop",
            EngineKind::Quant => "quant",
            EngineKind::Sls => "sls",
        }
    }

    /// Parse an option string
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fun" | "bitblast" => Some(EngineKind::Fun),
            "prop" => Some(EngineKind::Prop),
            "aigprop" => Some(EngineKind::AigProp),
            "quant" => Some(EngineKind::Quant),
            "sls" => Some(EngineKind::Sls),
            _ => None,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every configurable option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// Allow push/pop, assumptions and repeated checks
    Incremental,
    /// Keep a model after a satisfiable check
    ProduceModels,
    /// Track assertion provenance for unsat cores
    ProduceUnsatCores,
    /// Rewriting and preprocessing intensity, 0 to 3
    RewriteLevel,
    /// Decision procedure
    Engine,
    /// Threads requested from the SAT backend
    SatThreads,
    /// Seed of the local search engines
    Seed,
    /// Propagate top-level Boolean literals through the formula
    SkeletonPreproc,
    /// Eager Ackermann lemmas for uninterpreted functions
    Ackermann,
    /// Beta-reduce lambda applications during preprocessing
    BetaReduce,
    /// Replace Boolean if-then-else terms by clauses
    EliminateItes,
    /// Split bit-vector constants at their extraction boundaries
    EliminateSlices,
    /// Substitute top-level definitions `x = t`
    VarSubst,
    /// Unconstrained-term optimization
    Ucopt,
    /// Merge nested lambda chains into one lambda
    MergeLambdas,
    /// Turn memset and memcpy style store chains into lambdas
    ExtractLambdas,
    /// Final normalization pass after preprocessing
    Normalize,
    /// Propagation budget of the prop engine (0 = unlimited)
    PropNprops,
    /// Update budget of the prop engine (0 = unlimited)
    PropNupdates,
    /// Probability (per mille) of choosing an inverse value
    PropProbUseInvValue,
    /// Propagation budget of the aigprop engine (0 = unlimited)
    AigpropNprops,
    /// Candidate budget of instantiation synthesis
    QuantSynthLimit,
    /// Synthesize instantiation terms instead of plain values
    QuantSynthQi,
    /// Fall back to the dual formula when rounds run out
    QuantDualSolver,
    /// Destructive equality resolution on quantifier bodies
    QuantDer,
    /// Refinement rounds of the quant engine
    QuantMaxRounds,
    /// Move budget of the sls engine (0 = unlimited)
    SlsNflips,
    /// Flip the low bit ranges of a candidate
    SlsMoveRange,
    /// Flip aligned bit segments of a candidate
    SlsMoveSegment,
    /// Take random walk steps
    SlsMoveRandWalk,
    /// Probability (per mille) of a random walk step
    SlsProbMoveRandWalk,
    /// Restart from a random assignment when progress stalls
    SlsUseRestarts,
    /// Lazy congruence refinement rounds of the bit-blasting engine
    RefinementLimit,
}

impl OptionKind {
    /// All options in documentation order
    pub const ALL: [OptionKind; 33] = [
        OptionKind::Incremental,
        OptionKind::ProduceModels,
        OptionKind::ProduceUnsatCores,
        OptionKind::RewriteLevel,
        OptionKind::Engine,
        OptionKind::SatThreads,
        OptionKind::Seed,
        OptionKind::SkeletonPreproc,
        OptionKind::Ackermann,
        OptionKind::BetaReduce,
        OptionKind::EliminateItes,
        OptionKind::EliminateSlices,
        OptionKind::VarSubst,
        OptionKind::Ucopt,
        OptionKind::MergeLambdas,
        OptionKind::ExtractLambdas,
        OptionKind::Normalize,
        OptionKind::PropNprops,
        OptionKind::PropNupdates,
        OptionKind::PropProbUseInvValue,
        OptionKind::AigpropNprops,
        OptionKind::QuantSynthLimit,
        OptionKind::QuantSynthQi,
        OptionKind::QuantDualSolver,
        OptionKind::QuantDer,
        OptionKind::QuantMaxRounds,
        OptionKind::SlsNflips,
        OptionKind::SlsMoveRange,
        OptionKind::SlsMoveSegment,
        OptionKind::SlsMoveRandWalk,
        OptionKind::SlsProbMoveRandWalk,
        OptionKind::SlsUseRestarts,
        OptionKind::RefinementLimit,
    ];

    /// Long option name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            OptionKind::Incremental => "incremental",
            OptionKind::ProduceModels => "produce-models",
            OptionKind::ProduceUnsatCores => "produce-unsat-cores",
            OptionKind::RewriteLevel => "rewrite-level",
            OptionKind::Engine => "engine",
            OptionKind::SatThreads => "sat-threads",
            OptionKind::Seed => "seed",
            OptionKind::SkeletonPreproc => "skeleton-preproc",
            OptionKind::Ackermann => "ackermann",
            OptionKind::BetaReduce => "beta-reduce",
            OptionKind::EliminateItes => "eliminate-ites",
            OptionKind::EliminateSlices => "eliminate-slices",
            OptionKind::VarSubst => "var-subst",
            OptionKind::Ucopt => "ucopt",
            OptionKind::MergeLambdas => "merge-lambdas",
            OptionKind::ExtractLambdas => "extract-lambdas",
            OptionKind::Normalize => "normalize",
            OptionKind::PropNprops => "prop-nprops",
            OptionKind::PropNupdates => "prop-nupdates",
            OptionKind::PropProbUseInvValue => "prop-prob-use-inv-value",
            OptionKind::AigpropNprops => "aigprop-nprops",
            OptionKind::QuantSynthLimit => "quant-synth-limit",
            OptionKind::QuantSynthQi => "quant-synth-qi",
            OptionKind::QuantDualSolver => "quant-dual-solver",
            OptionKind::QuantDer => "quant-der",
            OptionKind::QuantMaxRounds => "quant-max-rounds",
            OptionKind::SlsNflips => "sls-nflips",
            OptionKind::SlsMoveRange => "sls-move-range",
            OptionKind::SlsMoveSegment => "sls-move-segment",
            OptionKind::SlsMoveRandWalk => "sls-move-rand-walk",
            OptionKind::SlsProbMoveRandWalk => "sls-prob-move-rand-walk",
            OptionKind::SlsUseRestarts => "sls-use-restarts",
            OptionKind::RefinementLimit => "refinement-limit",
        }
    }

    /// Look up an option by its long name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Options that may only change before any term exists
    #[must_use]
    pub fn is_frozen_after_terms(self) -> bool {
        matches!(self, OptionKind::Incremental | OptionKind::RewriteLevel)
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Flag
    Bool(bool),
    /// Numeric option
    Int(u64),
    /// Enumerated option
    Str(String),
}

impl OptionValue {
    fn as_flag(&self, kind: OptionKind) -> Result<bool> {
        match self {
            OptionValue::Bool(b) => Ok(*b),
            OptionValue::Int(0) => Ok(false),
            OptionValue::Int(1) => Ok(true),
            OptionValue::Str(s) if s == "true" => Ok(true),
            OptionValue::Str(s) if s == "false" => Ok(false),
            other => Err(OxbitError::config(format!("'{kind}' expects a flag, got {other}"))),
        }
    }

    fn as_int(&self, kind: OptionKind) -> Result<u64> {
        match self {
            OptionValue::Int(n) => Ok(*n),
            OptionValue::Str(s) => s
                .parse()
                .map_err(|_| OxbitError::config(format!("'{kind}' expects a number, got '{s}'"))),
            OptionValue::Bool(_) => Err(OxbitError::config(format!("'{kind}' expects a number"))),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<u64> for OptionValue {
    fn from(n: u64) -> Self {
        OptionValue::Int(n)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Allow push/pop, assumptions and repeated checks
    pub incremental: bool,
    /// Keep a model after a satisfiable check
    pub produce_models: bool,
    /// Track provenance for unsat cores
    pub produce_unsat_cores: bool,
    /// Rewriting and preprocessing level (0-3)
    pub rewrite_level: u8,
    /// Decision procedure
    pub engine: EngineKind,
    /// SAT backend threads
    pub sat_threads: u32,
    /// Seed of the local search engines
    pub seed: u64,
    /// Skeleton preprocessing
    pub skeleton_preproc: bool,
    /// Eager Ackermann lemmas
    pub ackermann: bool,
    /// Beta reduction during preprocessing
    pub beta_reduce: bool,
    /// Boolean ite elimination
    pub eliminate_ites: bool,
    /// Slice elimination
    pub eliminate_slices: bool,
    /// Variable substitution
    pub var_subst: bool,
    /// Unconstrained-term optimization
    pub ucopt: bool,
    /// Lambda chain merging
    pub merge_lambdas: bool,
    /// Lambda extraction from store chains
    pub extract_lambdas: bool,
    /// Final normalization pass
    pub normalize: bool,
    /// Prop engine propagation budget
    pub prop_nprops: u64,
    /// Prop engine update budget
    pub prop_nupdates: u64,
    /// Inverse value probability in per mille
    pub prop_prob_use_inv_value: u32,
    /// Aigprop engine propagation budget
    pub aigprop_nprops: u64,
    /// Synthesis candidate budget
    pub quant_synth_limit: u32,
    /// Synthesize instantiation terms
    pub quant_synth_qi: bool,
    /// Dual solver fallback
    pub quant_dual_solver: bool,
    /// Destructive equality resolution
    pub quant_der: bool,
    /// Instantiation rounds
    pub quant_max_rounds: u32,
    /// Sls engine move budget
    pub sls_nflips: u64,
    /// Range-wise flip moves
    pub sls_move_range: bool,
    /// Segment-wise flip moves
    pub sls_move_segment: bool,
    /// Random walk steps
    pub sls_move_rand_walk: bool,
    /// Random walk probability in per mille
    pub sls_prob_move_rand_walk: u32,
    /// Restarts of the sls engine
    pub sls_use_restarts: bool,
    /// Lazy congruence refinement rounds
    pub refinement_limit: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            incremental: false,
            produce_models: false,
            produce_unsat_cores: false,
            rewrite_level: 3,
            engine: EngineKind::Fun,
            sat_threads: 1,
            seed: 42,
            skeleton_preproc: true,
            ackermann: false,
            beta_reduce: true,
            eliminate_ites: false,
            eliminate_slices: true,
            var_subst: true,
            ucopt: false,
            merge_lambdas: true,
            extract_lambdas: true,
            normalize: true,
            prop_nprops: 0,
            prop_nupdates: 2_000_000,
            prop_prob_use_inv_value: 990,
            aigprop_nprops: 0,
            quant_synth_limit: 1000,
            quant_synth_qi: true,
            quant_dual_solver: true,
            quant_der: true,
            quant_max_rounds: 200,
            sls_nflips: 20_000,
            sls_move_range: true,
            sls_move_segment: true,
            sls_move_rand_walk: false,
            sls_prob_move_rand_walk: 100,
            sls_use_restarts: true,
            refinement_limit: 10_000,
        }
    }
}

impl Options {
    /// Incremental configuration with models and unsat cores
    #[must_use]
    pub fn incremental() -> Self {
        Self {
            incremental: true,
            produce_models: true,
            produce_unsat_cores: true,
            ..Self::default()
        }
    }

    /// Rewriting and preprocessing disabled
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            rewrite_level: 0,
            skeleton_preproc: false,
            beta_reduce: false,
            eliminate_slices: false,
            var_subst: false,
            merge_lambdas: false,
            extract_lambdas: false,
            normalize: false,
            ..Self::default()
        }
    }

    /// Set incrementality
    #[must_use]
    pub fn with_incremental(mut self, on: bool) -> Self {
        self.incremental = on;
        self
    }

    /// Set model production
    #[must_use]
    pub fn with_models(mut self, on: bool) -> Self {
        self.produce_models = on;
        self
    }

    /// Set unsat core production
    #[must_use]
    pub fn with_unsat_cores(mut self, on: bool) -> Self {
        self.produce_unsat_cores = on;
        self
    }

    /// Set the rewrite level (clamped to 0-3)
    #[must_use]
    pub fn with_rewrite_level(mut self, level: u8) -> Self {
        self.rewrite_level = level.min(3);
        self
    }

    /// Select the engine
    #[must_use]
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Set the local search seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Current value of `kind`
    #[must_use]
    pub fn get(&self, kind: OptionKind) -> OptionValue {
        use OptionKind as K;
        match kind {
            K::Incremental => self.incremental.into(),
            K::ProduceModels => self.produce_models.into(),
            K::ProduceUnsatCores => self.produce_unsat_cores.into(),
            K::RewriteLevel => u64::from(self.rewrite_level).into(),
            K::Engine => self.engine.name().into(),
            K::SatThreads => u64::from(self.sat_threads).into(),
            K::Seed => self.seed.into(),
            K::SkeletonPreproc => self.skeleton_preproc.into(),
            K::Ackermann => self.ackermann.into(),
            K::BetaReduce => self.beta_reduce.into(),
            K::EliminateItes => self.eliminate_ites.into(),
            K::EliminateSlices => self.eliminate_slices.into(),
            K::VarSubst => self.var_subst.into(),
            K::Ucopt => self.ucopt.into(),
            K::MergeLambdas => self.merge_lambdas.into(),
            K::ExtractLambdas => self.extract_lambdas.into(),
            K::Normalize => self.normalize.into(),
            K::PropNprops => self.prop_nprops.into(),
            K::PropNupdates => self.prop_nupdates.into(),
            K::PropProbUseInvValue => u64::from(self.prop_prob_use_inv_value).into(),
            K::AigpropNprops => self.aigprop_nprops.into(),
            K::QuantSynthLimit => u64::from(self.quant_synth_limit).into(),
            K::QuantSynthQi => self.quant_synth_qi.into(),
            K::QuantDualSolver => self.quant_dual_solver.into(),
            K::QuantDer => self.quant_der.into(),
            K::QuantMaxRounds => u64::from(self.quant_max_rounds).into(),
            K::SlsNflips => self.sls_nflips.into(),
            K::SlsMoveRange => self.sls_move_range.into(),
            K::SlsMoveSegment => self.sls_move_segment.into(),
            K::SlsMoveRandWalk => self.sls_move_rand_walk.into(),
            K::SlsProbMoveRandWalk => u64::from(self.sls_prob_move_rand_walk).into(),
            K::SlsUseRestarts => self.sls_use_restarts.into(),
            K::RefinementLimit => u64::from(self.refinement_limit).into(),
        }
    }

    /// Validate and store a value.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a value of the wrong type, a value
    /// out of range, or a combination that is not supported (unconstrained
    /// optimization together with incrementality or model production).
    pub fn set(&mut self, kind: OptionKind, value: &OptionValue) -> Result<()> {
        use OptionKind as K;
        let ranged = |lo: u64, hi: u64| -> Result<u64> {
            let n = value.as_int(kind)?;
            if n < lo || n > hi {
                return Err(OxbitError::config(format!(
                    "'{kind}' must be in {lo}..={hi}, got {n}"
                )));
            }
            Ok(n)
        };
        match kind {
            K::Incremental => {
                let on = value.as_flag(kind)?;
                if on && self.ucopt {
                    return Err(OxbitError::config(
                        "incremental solving cannot be combined with ucopt",
                    ));
                }
                self.incremental = on;
            }
            K::ProduceModels => {
                let on = value.as_flag(kind)?;
                if on && self.ucopt {
                    return Err(OxbitError::config("model production cannot be combined with ucopt"));
                }
                self.produce_models = on;
            }
            K::Ucopt => {
                let on = value.as_flag(kind)?;
                if on && self.incremental {
                    return Err(OxbitError::config("ucopt cannot be combined with incremental solving"));
                }
                if on && self.produce_models {
                    return Err(OxbitError::config("ucopt cannot be combined with model production"));
                }
                self.ucopt = on;
            }
            K::ProduceUnsatCores => self.produce_unsat_cores = value.as_flag(kind)?,
            K::RewriteLevel => self.rewrite_level = ranged(0, 3)? as u8,
            K::Engine => {
                let name = match value {
                    OptionValue::Str(s) => s.as_str(),
                    other => {
                        return Err(OxbitError::config(format!(
                            "'engine' expects one of fun, prop, aigprop, quant, sls; got {other}"
                        )));
                    }
                };
                self.engine = EngineKind::from_name(name)
                    .ok_or_else(|| OxbitError::config(format!("unknown engine '{name}'")))?;
            }
            K::SatThreads => self.sat_threads = ranged(1, 256)? as u32,
            K::Seed => self.seed = value.as_int(kind)?,
            K::SkeletonPreproc => self.skeleton_preproc = value.as_flag(kind)?,
            K::Ackermann => self.ackermann = value.as_flag(kind)?,
            K::BetaReduce => self.beta_reduce = value.as_flag(kind)?,
            K::EliminateItes => self.eliminate_ites = value.as_flag(kind)?,
            K::EliminateSlices => self.eliminate_slices = value.as_flag(kind)?,
            K::VarSubst => self.var_subst = value.as_flag(kind)?,
            K::MergeLambdas => self.merge_lambdas = value.as_flag(kind)?,
            K::ExtractLambdas => self.extract_lambdas = value.as_flag(kind)?,
            K::Normalize => self.normalize = value.as_flag(kind)?,
            K::PropNprops => self.prop_nprops = value.as_int(kind)?,
            K::PropNupdates => self.prop_nupdates = value.as_int(kind)?,
            K::PropProbUseInvValue => self.prop_prob_use_inv_value = ranged(0, 1000)? as u32,
            K::AigpropNprops => self.aigprop_nprops = value.as_int(kind)?,
            K::QuantSynthLimit => self.quant_synth_limit = ranged(0, u64::from(u32::MAX))? as u32,
            K::QuantSynthQi => self.quant_synth_qi = value.as_flag(kind)?,
            K::QuantDualSolver => self.quant_dual_solver = value.as_flag(kind)?,
            K::QuantDer => self.quant_der = value.as_flag(kind)?,
            K::QuantMaxRounds => self.quant_max_rounds = ranged(1, u64::from(u32::MAX))? as u32,
            K::SlsNflips => self.sls_nflips = value.as_int(kind)?,
            K::SlsMoveRange => self.sls_move_range = value.as_flag(kind)?,
            K::SlsMoveSegment => self.sls_move_segment = value.as_flag(kind)?,
            K::SlsMoveRandWalk => self.sls_move_rand_walk = value.as_flag(kind)?,
            K::SlsProbMoveRandWalk => self.sls_prob_move_rand_walk = ranged(0, 1000)? as u32,
            K::SlsUseRestarts => self.sls_use_restarts = value.as_flag(kind)?,
            K::RefinementLimit => self.refinement_limit = ranged(1, u64::from(u32::MAX))? as u32,
        }
        Ok(())
    }

    /// Set an option by its long name
    ///
    /// # Errors
    ///
    /// Unknown names and invalid values are configuration errors.
    pub fn set_by_name(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        let kind = OptionKind::from_name(name)
            .ok_or_else(|| OxbitError::config(format!("unknown option '{name}'")))?;
        self.set(kind, value)
    }

    /// Preprocessing passes of level 2 and above are enabled
    #[must_use]
    pub(crate) fn basic_preprocessing(&self) -> bool {
        self.rewrite_level >= 2
    }

    /// Preprocessing passes of level 3 are enabled
    #[must_use]
    pub(crate) fn full_preprocessing(&self) -> bool {
        self.rewrite_level >= 3
    }
}
