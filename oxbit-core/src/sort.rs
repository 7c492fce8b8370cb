//! Sort system
//!
//! Sorts are value objects interned in a [`SortManager`]: two structurally
//! equal sort descriptions always map to the same [`SortId`].

use crate::error::{OxbitError, Result};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;

/// Handle of an interned sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortId(pub(crate) u32);

impl SortId {
    /// Raw index of this sort inside its manager
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structural description of a sort
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKind {
    /// Boolean sort
    Bool,
    /// Bit-vector sort of the given width
    BitVec(u32),
    /// Floating-point sort (exponent width, significand width incl. hidden bit)
    FloatingPoint {
        /// Exponent width
        exp: u32,
        /// Significand width including the hidden bit
        sig: u32,
    },
    /// Array sort
    Array {
        /// Index sort
        index: SortId,
        /// Element sort
        element: SortId,
    },
    /// Function sort
    Function {
        /// Domain sorts
        domain: SmallVec<[SortId; 4]>,
        /// Codomain sort
        codomain: SortId,
    },
    /// Rounding-mode sort
    RoundingMode,
}

/// An interned sort
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    /// Structural description
    pub kind: SortKind,
}

impl Sort {
    /// Is this the Boolean sort
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.kind, SortKind::Bool)
    }

    /// Is this a bit-vector sort
    #[must_use]
    pub fn is_bv(&self) -> bool {
        matches!(self.kind, SortKind::BitVec(_))
    }

    /// Is this a floating-point sort
    #[must_use]
    pub fn is_fp(&self) -> bool {
        matches!(self.kind, SortKind::FloatingPoint { .. })
    }

    /// Is this an array sort
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, SortKind::Array { .. })
    }

    /// Is this a function sort
    #[must_use]
    pub fn is_fun(&self) -> bool {
        matches!(self.kind, SortKind::Function { .. })
    }

    /// Is this the rounding-mode sort
    #[must_use]
    pub fn is_rm(&self) -> bool {
        matches!(self.kind, SortKind::RoundingMode)
    }

    /// Width of a bit-vector sort
    #[must_use]
    pub fn bv_width(&self) -> Option<u32> {
        match self.kind {
            SortKind::BitVec(w) => Some(w),
            _ => None,
        }
    }

    /// Exponent and significand width of a floating-point sort
    #[must_use]
    pub fn fp_format(&self) -> Option<(u32, u32)> {
        match self.kind {
            SortKind::FloatingPoint { exp, sig } => Some((exp, sig)),
            _ => None,
        }
    }

    /// Index and element sort of an array sort
    #[must_use]
    pub fn array_sorts(&self) -> Option<(SortId, SortId)> {
        match self.kind {
            SortKind::Array { index, element } => Some((index, element)),
            _ => None,
        }
    }

    /// Domain and codomain of a function sort
    #[must_use]
    pub fn fun_sorts(&self) -> Option<(&[SortId], SortId)> {
        match &self.kind {
            SortKind::Function { domain, codomain } => Some((domain.as_slice(), *codomain)),
            _ => None,
        }
    }

    /// Number of bits needed to represent a value of this sort, for the
    /// sorts that have a fixed-width bit representation.
    #[must_use]
    pub fn bit_width(&self) -> Option<u32> {
        match self.kind {
            SortKind::Bool => Some(1),
            SortKind::BitVec(w) => Some(w),
            SortKind::FloatingPoint { exp, sig } => Some(exp + sig),
            SortKind::RoundingMode => Some(3),
            _ => None,
        }
    }
}

/// Hash-consing table of sorts
#[derive(Debug, Clone)]
pub struct SortManager {
    sorts: Vec<Sort>,
    cache: FxHashMap<SortKind, SortId>,
    /// The Boolean sort
    pub bool_sort: SortId,
    /// The rounding-mode sort
    pub rm_sort: SortId,
}

impl Default for SortManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SortManager {
    /// Create a manager holding the builtin sorts
    #[must_use]
    pub fn new() -> Self {
        let mut manager = Self {
            sorts: Vec::new(),
            cache: FxHashMap::default(),
            bool_sort: SortId(0),
            rm_sort: SortId(0),
        };
        manager.bool_sort = manager.intern(SortKind::Bool);
        manager.rm_sort = manager.intern(SortKind::RoundingMode);
        manager
    }

    fn intern(&mut self, kind: SortKind) -> SortId {
        if let Some(&id) = self.cache.get(&kind) {
            return id;
        }
        let id = SortId(self.sorts.len() as u32);
        self.sorts.push(Sort { kind: kind.clone() });
        self.cache.insert(kind, id);
        id
    }

    /// Look up a sort
    #[must_use]
    pub fn get(&self, id: SortId) -> Option<&Sort> {
        self.sorts.get(id.index())
    }

    /// Number of interned sorts
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorts.len()
    }

    /// Whether no sort is interned (never true after construction)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty()
    }

    /// The Boolean sort
    #[must_use]
    pub fn mk_bool(&self) -> SortId {
        self.bool_sort
    }

    /// The rounding-mode sort
    #[must_use]
    pub fn mk_rm(&self) -> SortId {
        self.rm_sort
    }

    /// Bit-vector sort of width `width`
    pub fn mk_bv(&mut self, width: u32) -> Result<SortId> {
        if width == 0 {
            return Err(OxbitError::type_error("bit-vector width must be > 0"));
        }
        Ok(self.intern(SortKind::BitVec(width)))
    }

    /// Floating-point sort with exponent width `exp` and significand width
    /// `sig` (including the hidden bit)
    pub fn mk_fp(&mut self, exp: u32, sig: u32) -> Result<SortId> {
        if exp < 2 || sig < 2 {
            return Err(OxbitError::type_error(format!(
                "invalid floating-point format ({exp}, {sig}): both widths must be > 1"
            )));
        }
        if exp > 30 {
            return Err(OxbitError::type_error(format!(
                "floating-point exponent width {exp} exceeds the supported maximum of 30"
            )));
        }
        Ok(self.intern(SortKind::FloatingPoint { exp, sig }))
    }

    /// Array sort from `index` to `element`
    pub fn mk_array(&mut self, index: SortId, element: SortId) -> Result<SortId> {
        for (what, sort) in [("index", index), ("element", element)] {
            let s = self
                .get(sort)
                .ok_or_else(|| OxbitError::type_error(format!("unknown {what} sort")))?;
            if s.is_fun() {
                return Err(OxbitError::type_error(format!(
                    "array {what} sort must not be a function sort"
                )));
            }
        }
        Ok(self.intern(SortKind::Array { index, element }))
    }

    /// Function sort from `domain` to `codomain`
    pub fn mk_fun(&mut self, domain: &[SortId], codomain: SortId) -> Result<SortId> {
        if domain.is_empty() {
            return Err(OxbitError::type_error("function sort needs a non-empty domain"));
        }
        for &d in domain {
            let s = self
                .get(d)
                .ok_or_else(|| OxbitError::type_error("unknown domain sort"))?;
            if s.is_fun() || s.is_array() {
                return Err(OxbitError::type_error(
                    "function domain sorts must be Bool, bit-vector, floating-point or rounding-mode",
                ));
            }
        }
        let c = self
            .get(codomain)
            .ok_or_else(|| OxbitError::type_error("unknown codomain sort"))?;
        if c.is_fun() {
            return Err(OxbitError::type_error("function codomain must not be a function sort"));
        }
        Ok(self.intern(SortKind::Function {
            domain: domain.iter().copied().collect(),
            codomain,
        }))
    }

    /// Render a sort in SMT-LIB2 syntax
    #[must_use]
    pub fn display(&self, id: SortId) -> SortDisplay<'_> {
        SortDisplay { manager: self, id }
    }
}

/// [`fmt::Display`] adapter for sorts
pub struct SortDisplay<'a> {
    manager: &'a SortManager,
    id: SortId,
}

impl fmt::Display for SortDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(sort) = self.manager.get(self.id) else {
            return write!(f, "<sort {}>", self.id.0);
        };
        match &sort.kind {
            SortKind::Bool => write!(f, "Bool"),
            SortKind::BitVec(w) => write!(f, "(_ BitVec {w})"),
            SortKind::FloatingPoint { exp, sig } => write!(f, "(_ FloatingPoint {exp} {sig})"),
            SortKind::RoundingMode => write!(f, "RoundingMode"),
            SortKind::Array { index, element } => write!(
                f,
                "(Array {} {})",
                self.manager.display(*index),
                self.manager.display(*element)
            ),
            SortKind::Function { domain, codomain } => {
                write!(f, "(")?;
                for (i, d) in domain.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", self.manager.display(*d))?;
                }
                write!(f, ") {}", self.manager.display(*codomain))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_interning() {
        let mut sm = SortManager::new();
        let a = sm.mk_bv(8).unwrap();
        let b = sm.mk_bv(8).unwrap();
        let c = sm.mk_bv(16).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let arr1 = sm.mk_array(a, c).unwrap();
        let arr2 = sm.mk_array(b, c).unwrap();
        assert_eq!(arr1, arr2);
    }

    #[test]
    fn test_invalid_sorts() {
        let mut sm = SortManager::new();
        assert!(sm.mk_bv(0).unwrap_err().is_type_error());
        assert!(sm.mk_fp(1, 5).is_err());
        let bv = sm.mk_bv(4).unwrap();
        let f = sm.mk_fun(&[bv], bv).unwrap();
        assert!(sm.mk_array(f, bv).is_err());
        assert!(sm.mk_fun(&[], bv).is_err());
        assert!(sm.mk_fun(&[f], bv).is_err());
    }

    #[test]
    fn test_sort_display() {
        let mut sm = SortManager::new();
        let bv = sm.mk_bv(32).unwrap();
        let fp = sm.mk_fp(8, 24).unwrap();
        let arr = sm.mk_array(bv, fp).unwrap();
        assert_eq!(
            sm.display(arr).to_string(),
            "(Array (_ BitVec 32) (_ FloatingPoint 8 24))"
        );
    }
}
