//! The solver: assertion management and check orchestration

use crate::abort::abort;
use crate::context::AssertionStack;
use crate::engine::{AigPropEngine, BitblastEngine, Engine, PropEngine, QuantEngine, SlsEngine, has_quantifiers};
use crate::model::ModelOracle;
use crate::options::{EngineKind, OptionKind, OptionValue, Options};
use crate::preprocess::{Origin, Preprocessor, Root};
use crate::result::SatResult;
use crate::terminate::{TerminateCallback, TerminationHandle, TerminationMonitor};
use oxbit_core::ast::{TermId, TermManager};
use oxbit_core::parse::FormulaSink;
use oxbit_core::printer::{Printer, SmtLibPrinter};
use oxbit_core::rewrite::Rewriter;
use oxbit_core::{OxbitError, Result};
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

/// Solver statistics
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Calls to `check_sat`
    pub checks: u64,
    /// Checks answered `sat`
    pub sat: u64,
    /// Checks answered `unsat`
    pub unsat: u64,
    /// Checks answered `unknown`
    pub unknown: u64,
    /// Checks where a local search engine handed over to bit-blasting
    pub fallbacks: u64,
}

impl Statistics {
    /// Create new statistics with all counters set to zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Answer of the last check, valid until the next mutation
#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Sat(Option<ModelOracle>),
    Unsat {
        core: Vec<TermId>,
        assumptions: Vec<TermId>,
    },
    Unknown,
}

/// An SMT solver over bit-vectors, floating-point, arrays and
/// uninterpreted functions
///
/// The solver owns its [`TermManager`]; terms are built through
/// [`Solver::tm_mut`] and are only meaningful for this solver.
///
/// # Examples
///
/// ```
/// use oxbit_core::ast::TermKind;
/// use oxbit_solver::{Options, SatResult, Solver};
///
/// let mut solver = Solver::with_options(Options::default().with_models(true));
/// let tm = solver.tm_mut();
/// let bv8 = tm.mk_bv_sort(8).unwrap();
/// let x = tm.mk_const(bv8, Some("x"));
/// let one = tm.mk_bv_one(bv8).unwrap();
/// let zero = tm.mk_bv_zero(bv8).unwrap();
/// let sum = tm.mk_term(TermKind::BvAdd, &[x, one], &[]).unwrap();
/// let eq = tm.mk_eq(sum, zero).unwrap();
///
/// solver.assert(eq).unwrap();
/// assert_eq!(solver.check_sat().unwrap(), SatResult::Sat);
/// let v = solver.get_value(x).unwrap();
/// assert_eq!(solver.tm().value_of(v).and_then(|v| v.as_bv()).and_then(|b| b.to_u64()), Some(255));
/// ```
pub struct Solver {
    tm: TermManager,
    options: Options,
    stack: AssertionStack,
    rewriter: Rewriter,
    preprocessor: Preprocessor,
    monitor: TerminationMonitor,
    bitblast: Option<BitblastEngine>,
    state: State,
    /// Assumptions of the last check, retained until the next mutation
    last_assumptions: Vec<TermId>,
    statistics: Statistics,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("options", &self.options)
            .field("level", &self.stack.level())
            .field("assertions", &self.stack.num_assertions())
            .field("state", &self.state)
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Create a solver with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Create a solver with the given options
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            tm: TermManager::new(),
            rewriter: Rewriter::new(options.rewrite_level),
            options,
            stack: AssertionStack::new(),
            preprocessor: Preprocessor::new(),
            monitor: TerminationMonitor::new(),
            bitblast: None,
            state: State::Idle,
            last_assumptions: Vec::new(),
            statistics: Statistics::new(),
        }
    }

    /// The term manager
    #[must_use]
    pub fn tm(&self) -> &TermManager {
        &self.tm
    }

    /// The term manager, for building terms
    pub fn tm_mut(&mut self) -> &mut TermManager {
        &mut self.tm
    }

    /// Current options
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Statistics over all checks
    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Set an option
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid values, for conflicting
    /// combinations, and for changing `incremental` or `rewrite-level` after
    /// terms were created.
    pub fn set_option(&mut self, kind: OptionKind, value: impl Into<OptionValue>) -> Result<()> {
        let value = value.into();
        if kind.is_frozen_after_terms() && self.tm.has_user_terms() && self.options.get(kind) != value {
            return Err(OxbitError::config(format!(
                "'{kind}' cannot be changed after terms have been created"
            )));
        }
        self.options.set(kind, &value)?;
        if kind == OptionKind::RewriteLevel {
            self.rewriter = Rewriter::new(self.options.rewrite_level);
        }
        // engine configuration is read on construction
        self.bitblast = None;
        debug!(option = %kind, value = %value, "option set");
        Ok(())
    }

    /// Set an option by its long name
    ///
    /// # Errors
    ///
    /// See [`Solver::set_option`]; unknown names are configuration errors.
    pub fn set_option_by_name(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<()> {
        let kind = OptionKind::from_name(name)
            .ok_or_else(|| OxbitError::config(format!("unknown option '{name}'")))?;
        self.set_option(kind, value)
    }

    /// Value of an option
    #[must_use]
    pub fn get_option(&self, kind: OptionKind) -> OptionValue {
        self.options.get(kind)
    }

    fn check_formula(&self, term: TermId) -> Result<()> {
        let Some(t) = self.tm.get(term) else {
            return Err(OxbitError::type_error(format!("dangling term handle {term}")));
        };
        if !self.tm.sort(t.sort).is_bool() {
            return Err(OxbitError::type_error(format!("{term} is not a formula")));
        }
        if !t.is_ground() {
            return Err(OxbitError::type_error(format!("{term} contains free bound variables")));
        }
        Ok(())
    }

    fn require_incremental(&self, what: &str) -> Result<()> {
        if self.options.incremental {
            Ok(())
        } else {
            Err(OxbitError::state(format!("{what} requires incremental solving")))
        }
    }

    /// Forget the answer of the last check
    fn invalidate(&mut self) {
        self.state = State::Idle;
        for t in self.last_assumptions.drain(..) {
            self.tm.release(t);
        }
    }

    /// Add a formula to the innermost frame
    ///
    /// # Errors
    ///
    /// Returns a type error for non-Boolean terms and terms with free bound
    /// variables.
    pub fn assert(&mut self, term: TermId) -> Result<()> {
        self.check_formula(term)?;
        self.invalidate();
        self.stack.assert(&mut self.tm, term);
        Ok(())
    }

    /// Open `n` frames
    ///
    /// # Errors
    ///
    /// Returns a state error without incremental solving.
    pub fn push(&mut self, n: u32) -> Result<()> {
        self.require_incremental("push")?;
        self.invalidate();
        self.stack.push(n);
        Ok(())
    }

    /// Close `n` frames
    ///
    /// # Errors
    ///
    /// Returns a state error without incremental solving and when fewer than
    /// `n` frames are open; the stack is unchanged then.
    pub fn pop(&mut self, n: u32) -> Result<()> {
        self.require_incremental("pop")?;
        if n > self.stack.level() {
            return Err(OxbitError::state(format!(
                "cannot pop {n} levels, only {} open",
                self.stack.level()
            )));
        }
        self.invalidate();
        self.stack.pop(&mut self.tm, n)
    }

    /// Number of open frames
    #[must_use]
    pub fn level(&self) -> u32 {
        self.stack.level()
    }

    /// Assume a formula for the next check only
    ///
    /// # Errors
    ///
    /// Returns a state error without incremental solving and a type error for
    /// terms that are not closed formulas.
    pub fn assume(&mut self, term: TermId) -> Result<()> {
        self.require_incremental("assumptions")?;
        self.check_formula(term)?;
        self.invalidate();
        self.stack.assume(&mut self.tm, term);
        Ok(())
    }

    /// Turn the pending assumptions into assertions of the innermost frame
    pub fn fixate_assumptions(&mut self) {
        self.invalidate();
        self.stack.fixate_assumptions();
    }

    /// Drop the pending assumptions
    pub fn reset_assumptions(&mut self) {
        self.stack.clear_assumptions(&mut self.tm);
    }

    /// Active assertions, outermost frame first
    #[must_use]
    pub fn assertions(&self) -> Vec<TermId> {
        self.stack.assertions().collect()
    }

    /// Handle for interrupting checks from another thread
    #[must_use]
    pub fn terminate_handle(&self) -> TerminationHandle {
        self.monitor.handle()
    }

    /// Install a termination callback, polled during checks
    pub fn set_terminate(&mut self, callback: Option<TerminateCallback>) {
        self.monitor.set_callback(callback);
    }

    /// Decide the active assertions together with the pending assumptions.
    /// Assumptions are dropped afterwards.
    ///
    /// # Errors
    ///
    /// Returns a state error for a second check without incremental solving,
    /// and an unsupported-feature error for formulas outside the supported
    /// fragment.
    pub fn check_sat(&mut self) -> Result<SatResult> {
        if self.statistics.checks > 0 && !self.options.incremental {
            return Err(OxbitError::state("repeated check-sat requires incremental solving"));
        }
        self.invalidate();
        self.statistics.checks += 1;
        let assertions: Vec<TermId> = self.stack.assertions().collect();
        let assumptions: Vec<TermId> = self.stack.assumptions().to_vec();
        info!(
            check = self.statistics.checks,
            assertions = assertions.len(),
            assumptions = assumptions.len(),
            level = self.stack.level(),
            "check-sat"
        );
        self.tm.begin_internal();
        let outcome = self.solve(&assertions, &assumptions);
        self.tm.end_internal();
        // assumptions are consumed by the check; ownership moves to the answer
        for &a in &assumptions {
            self.tm.retain(a);
        }
        self.stack.clear_assumptions(&mut self.tm);
        self.last_assumptions = assumptions;
        self.monitor.clear();
        let result = match outcome {
            Ok(r) => r,
            Err(e) => {
                self.state = State::Idle;
                return Err(e);
            }
        };
        match result {
            SatResult::Sat => self.statistics.sat += 1,
            SatResult::Unsat => self.statistics.unsat += 1,
            SatResult::Unknown => self.statistics.unknown += 1,
        }
        info!(result = %result, "check-sat finished");
        Ok(result)
    }

    fn solve(&mut self, assertions: &[TermId], assumptions: &[TermId]) -> Result<SatResult> {
        let mut roots: Vec<Root> = Vec::with_capacity(assertions.len() + assumptions.len());
        roots.extend(
            assertions
                .iter()
                .enumerate()
                .map(|(i, &t)| Root::new(t, Origin::Assertion(i))),
        );
        roots.extend(
            assumptions
                .iter()
                .enumerate()
                .map(|(i, &t)| Root::new(t, Origin::Assumption(i))),
        );
        let roots = self
            .preprocessor
            .run(&mut self.tm, &mut self.rewriter, &self.options, roots)?;
        if self.monitor.should_terminate() {
            warn!("check-sat interrupted before dispatch");
            self.state = State::Unknown;
            return Ok(SatResult::Unknown);
        }

        let want_model = self.options.produce_models;
        let quantified = roots.iter().any(|r| has_quantifiers(&self.tm, r.term));
        let kind = if quantified { EngineKind::Quant } else { self.options.engine };
        debug!(engine = %kind, roots = roots.len(), "dispatch");
        let (result, failed, model) = match kind {
            EngineKind::Quant => {
                let mut engine = QuantEngine::new(&self.options);
                run_engine(&mut engine, &mut self.tm, &roots, &self.monitor, want_model)?
            }
            EngineKind::Prop | EngineKind::AigProp | EngineKind::Sls => {
                let mut engine: Box<dyn Engine> = match kind {
                    EngineKind::Prop => Box::new(PropEngine::new(&self.options)),
                    EngineKind::AigProp => Box::new(AigPropEngine::new(&self.options)),
                    _ => Box::new(SlsEngine::new(&self.options)),
                };
                let local = run_local_search(engine.as_mut(), &mut self.tm, &roots, &self.monitor, want_model)?;
                match local {
                    Some(found) => found,
                    None => {
                        self.statistics.fallbacks += 1;
                        debug!(engine = %kind, "falling back to bit-blasting");
                        self.run_bitblast(&roots)?
                    }
                }
            }
            EngineKind::Fun => self.run_bitblast(&roots)?,
        };

        self.state = match result {
            SatResult::Sat => State::Sat(model.map(ModelOracle::new)),
            SatResult::Unsat => {
                let (core, failed_assumptions) = explain(&roots, &failed, assertions, assumptions);
                State::Unsat {
                    core,
                    assumptions: failed_assumptions,
                }
            }
            SatResult::Unknown => State::Unknown,
        };
        Ok(result)
    }

    fn run_bitblast(&mut self, roots: &[Root]) -> Result<EngineOutcome> {
        let engine = self
            .bitblast
            .get_or_insert_with(|| BitblastEngine::new(&self.options));
        run_engine(engine, &mut self.tm, roots, &self.monitor, self.options.produce_models)
    }

    fn require_model(&self) -> Result<()> {
        if !self.options.produce_models {
            return Err(OxbitError::config("model production is not enabled"));
        }
        match &self.state {
            State::Sat(Some(_)) => Ok(()),
            State::Sat(None) => Err(OxbitError::state("no model available")),
            _ => Err(OxbitError::state("the last check-sat did not answer sat")),
        }
    }

    /// Value of `term` in the model of the last check, as a value term
    ///
    /// # Errors
    ///
    /// Returns a state error unless the last check answered `sat` and
    /// nothing changed since, and a configuration error without model
    /// production.
    pub fn get_value(&mut self, term: TermId) -> Result<TermId> {
        if self.tm.get(term).is_none() {
            return Err(OxbitError::type_error(format!("dangling term handle {term}")));
        }
        let value = self.model_value(term)?;
        // the caller owns the returned value term
        self.tm.retain(value);
        Ok(value)
    }

    /// Model value of `term` without registering an owner
    fn model_value(&mut self, term: TermId) -> Result<TermId> {
        self.require_model()?;
        let State::Sat(Some(oracle)) = &mut self.state else {
            return Err(OxbitError::state("no model available"));
        };
        self.tm.begin_internal();
        let value = oracle.value(&mut self.tm, term);
        self.tm.end_internal();
        value
    }

    /// Values of several terms
    ///
    /// # Errors
    ///
    /// See [`Solver::get_value`].
    pub fn get_values(&mut self, terms: &[TermId]) -> Result<Vec<TermId>> {
        terms.iter().map(|&t| self.get_value(t)).collect()
    }

    /// The model as SMT-LIB2 `define-fun` entries for every constant of the
    /// active assertions
    ///
    /// # Errors
    ///
    /// See [`Solver::get_value`].
    pub fn print_model(&mut self) -> Result<String> {
        self.require_model()?;
        let assertions: Vec<TermId> = self.stack.assertions().collect();
        let consts = self.tm.collect_consts(&assertions);
        let mut pairs = Vec::with_capacity(consts.len());
        for c in consts {
            pairs.push((c, self.model_value(c)?));
        }
        let mut out = String::new();
        SmtLibPrinter::new()
            .write_model(&self.tm, &pairs, &mut out)
            .map_err(|_| OxbitError::state("failed to render the model"))?;
        Ok(out)
    }

    /// The active assertions as an SMT-LIB2 script
    #[must_use]
    pub fn print_formula(&self) -> String {
        let assertions: Vec<TermId> = self.stack.assertions().collect();
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = SmtLibPrinter::new().write_formula(&self.tm, &assertions, &mut out);
        out
    }

    /// Assertions sufficient for the last `unsat` answer
    ///
    /// # Errors
    ///
    /// Returns a state error unless the last check answered `unsat` and
    /// nothing changed since, and a configuration error without unsat core
    /// production.
    pub fn get_unsat_core(&self) -> Result<Vec<TermId>> {
        if !self.options.produce_unsat_cores {
            return Err(OxbitError::config("unsat core production is not enabled"));
        }
        match &self.state {
            State::Unsat { core, .. } => Ok(core.clone()),
            _ => Err(OxbitError::state("the last check-sat did not answer unsat")),
        }
    }

    /// Assumptions of the last check involved in its `unsat` answer
    ///
    /// # Errors
    ///
    /// Returns a state error unless the last check answered `unsat` and
    /// nothing changed since.
    pub fn get_unsat_assumptions(&self) -> Result<Vec<TermId>> {
        match &self.state {
            State::Unsat { assumptions, .. } => Ok(assumptions.clone()),
            _ => Err(OxbitError::state("the last check-sat did not answer unsat")),
        }
    }

    /// Is `term` one of the failed assumptions of the last check
    ///
    /// # Errors
    ///
    /// Returns a state error unless the last check answered `unsat`, and
    /// when `term` was not assumed in that check.
    pub fn is_unsat_assumption(&self, term: TermId) -> Result<bool> {
        let failed = self.get_unsat_assumptions()?;
        if !self.last_assumptions.contains(&term) {
            return Err(OxbitError::state(format!("{term} was not assumed in the last check")));
        }
        Ok(failed.contains(&term))
    }

    /// Rewrite the active assertions. Answers `sat` when all of them reduce
    /// to true, `unsat` when one reduces to false, `unknown` otherwise.
    ///
    /// # Errors
    ///
    /// Propagates rewriting failures.
    pub fn simplify(&mut self) -> Result<SatResult> {
        let assertions: Vec<TermId> = self.stack.assertions().collect();
        self.tm.begin_internal();
        let reduced = self.rewriter.normalize_all(&mut self.tm, &assertions);
        self.tm.end_internal();
        let mut all_true = true;
        for r in reduced? {
            match self.tm.bool_value(r) {
                Some(false) => return Ok(SatResult::Unsat),
                Some(true) => {}
                None => all_true = false,
            }
        }
        Ok(if all_true { SatResult::Sat } else { SatResult::Unknown })
    }

    /// Free every term that is neither owned nor reachable from an owned
    /// term. Returns the number of freed terms.
    pub fn garbage_collect(&mut self) -> usize {
        // engine caches key on terms that may be freed now
        self.bitblast = None;
        self.rewriter.clear_cache();
        if let State::Sat(Some(oracle)) = &mut self.state {
            oracle.clear_cache();
        }
        let freed = self.tm.garbage_collect();
        debug!(freed, "garbage collection");
        freed
    }
}

type EngineOutcome = (SatResult, Vec<usize>, Option<crate::model::Model>);

fn run_engine(
    engine: &mut dyn Engine,
    tm: &mut TermManager,
    roots: &[Root],
    monitor: &TerminationMonitor,
    want_model: bool,
) -> Result<EngineOutcome> {
    engine.reset_roots();
    for root in roots {
        if !engine.try_assert(tm, root.term)? {
            return Err(OxbitError::unsupported(format!(
                "the {} engine cannot decide {}",
                engine.name(),
                root.term
            )));
        }
    }
    let result = engine.check_sat(tm, monitor)?;
    let model = if result.is_sat() && want_model {
        Some(engine.assignment(tm)?)
    } else {
        None
    };
    let failed = if result.is_unsat() { engine.failed_roots() } else { Vec::new() };
    Ok((result, failed, model))
}

/// Run a local search engine; `None` asks for bit-blasting instead
fn run_local_search(
    engine: &mut dyn Engine,
    tm: &mut TermManager,
    roots: &[Root],
    monitor: &TerminationMonitor,
    want_model: bool,
) -> Result<Option<EngineOutcome>> {
    engine.reset_roots();
    for root in roots {
        if !engine.try_assert(tm, root.term)? {
            debug!(engine = engine.name(), root = %root.term, "root declined");
            return Ok(None);
        }
    }
    match engine.check_sat(tm, monitor)? {
        SatResult::Sat => {
            let model = if want_model { Some(engine.assignment(tm)?) } else { None };
            Ok(Some((SatResult::Sat, Vec::new(), model)))
        }
        SatResult::Unknown if monitor.is_terminated() => Ok(Some((SatResult::Unknown, Vec::new(), None))),
        _ => Ok(None),
    }
}

/// Map failed roots back to assertions and assumptions. Without failed
/// roots every origin is blamed.
fn explain(
    roots: &[Root],
    failed: &[usize],
    assertions: &[TermId],
    assumptions: &[TermId],
) -> (Vec<TermId>, Vec<TermId>) {
    let mut origins: FxHashSet<Origin> = FxHashSet::default();
    for &i in failed {
        match roots.get(i) {
            Some(r) => origins.extend(r.origins.iter().copied()),
            None => abort(&format!("failed root {i} out of range ({} roots)", roots.len())),
        }
    }
    if origins.is_empty() {
        origins.extend((0..assertions.len()).map(Origin::Assertion));
        origins.extend((0..assumptions.len()).map(Origin::Assumption));
    }
    let core = assertions
        .iter()
        .enumerate()
        .filter(|(i, _)| origins.contains(&Origin::Assertion(*i)))
        .map(|(_, &t)| t)
        .collect();
    let failed_assumptions = assumptions
        .iter()
        .enumerate()
        .filter(|(i, _)| origins.contains(&Origin::Assumption(*i)))
        .map(|(_, &t)| t)
        .collect();
    (core, failed_assumptions)
}

impl FormulaSink for Solver {
    fn term_manager(&mut self) -> &mut TermManager {
        &mut self.tm
    }

    fn assert_formula(&mut self, term: TermId) -> Result<()> {
        self.assert(term)
    }

    fn push(&mut self, levels: u32) -> Result<()> {
        Solver::push(self, levels)
    }

    fn pop(&mut self, levels: u32) -> Result<()> {
        Solver::pop(self, levels)
    }
}
