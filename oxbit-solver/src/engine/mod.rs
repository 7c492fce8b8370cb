//! Decision engines
//!
//! Every engine receives the preprocessed roots of one check through
//! [`Engine::try_assert`], decides them with [`Engine::check_sat`] and
//! reports either a model or the indices of the roots involved in the
//! conflict. Engines may decline roots they cannot handle; the solver then
//! falls back to another engine.

pub mod aig;
pub mod aigprop;
pub mod blast;
pub mod cnf;
pub mod elim;
pub mod float;
pub mod fun;
pub mod prop;
pub mod quant;
pub mod sls;

pub use aigprop::AigPropEngine;
pub use fun::BitblastEngine;
pub use prop::PropEngine;
pub use quant::QuantEngine;
pub use sls::SlsEngine;

use crate::model::Model;
use crate::result::SatResult;
use crate::terminate::TerminationMonitor;
use oxbit_core::Result;
use oxbit_core::ast::{TermId, TermKind, TermManager};

/// A decision procedure for sets of Boolean roots
pub trait Engine {
    /// Engine name, used in logs
    fn name(&self) -> &'static str;

    /// Forget the roots of the previous check; learned facts may persist
    fn reset_roots(&mut self);

    /// Offer the next root. Returns `false` when the engine cannot decide
    /// formulas containing it.
    ///
    /// # Errors
    ///
    /// Fails on constructs the engine recognizes but cannot encode.
    fn try_assert(&mut self, tm: &mut TermManager, root: TermId) -> Result<bool>;

    /// Decide the conjunction of the accepted roots
    ///
    /// # Errors
    ///
    /// Fails on unsupported constructs discovered while solving.
    fn check_sat(&mut self, tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult>;

    /// Model of the last satisfiable check, covering every constant of the
    /// accepted roots
    ///
    /// # Errors
    ///
    /// Fails when the last check was not satisfiable.
    fn assignment(&mut self, tm: &mut TermManager) -> Result<Model>;

    /// Indices (in acceptance order) of roots in the last conflict
    fn failed_roots(&self) -> Vec<usize>;
}

/// Kinds that only the quantifier engine handles
pub(crate) const QUANTIFIER_KINDS: [TermKind; 2] = [TermKind::Forall, TermKind::Exists];

/// Does `root` contain a quantifier
pub(crate) fn has_quantifiers(tm: &TermManager, root: TermId) -> bool {
    tm.contains_kind(&[root], &QUANTIFIER_KINDS)
}
