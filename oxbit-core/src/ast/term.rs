//! Term nodes

use super::kind::TermKind;
use crate::sort::SortId;
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;

/// Handle of a term inside its [`TermManager`](super::TermManager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    /// Raw index of this term
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw id
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Child list of a term
pub type TermArgs = SmallVec<[TermId; 3]>;

/// An immutable DAG node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Operator
    pub kind: TermKind,
    /// Sort of the term
    pub sort: SortId,
    /// Ordered children
    pub args: TermArgs,
    /// Integer indices of indexed operators
    pub indices: SmallVec<[u32; 2]>,
    /// Literal payload of value terms
    pub value: Option<Value>,
    /// Bound variables occurring free in this term, sorted by id
    pub free_vars: SmallVec<[TermId; 2]>,
}

impl Term {
    /// Is this a value term
    #[must_use]
    pub fn is_value(&self) -> bool {
        self.kind == TermKind::Value
    }

    /// Is this an uninterpreted constant
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.kind == TermKind::Const
    }

    /// Is this a bound variable
    #[must_use]
    pub fn is_var(&self) -> bool {
        self.kind == TermKind::Var
    }

    /// Does no bound variable occur free
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.free_vars.is_empty()
    }

    /// Boolean payload of `true`/`false`
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(Value::as_bool)
    }
}

/// Structural identity of a term (symbols excluded)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TermKey {
    pub kind: TermKind,
    pub sort: SortId,
    pub args: TermArgs,
    pub indices: SmallVec<[u32; 2]>,
    pub value: Option<Value>,
}

impl TermKey {
    pub(crate) fn of(term: &Term) -> Self {
        Self {
            kind: term.kind,
            sort: term.sort,
            args: term.args.clone(),
            indices: term.indices.clone(),
            value: term.value.clone(),
        }
    }
}
