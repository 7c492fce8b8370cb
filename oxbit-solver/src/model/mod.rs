//! Models and value queries
//!
//! An engine that answers `sat` hands back a [`Model`]: a value for every
//! constant it decided. Arrays and functions are finite tables with a
//! default. The [`ModelOracle`] evaluates arbitrary terms under a model and
//! turns the results back into terms of the term manager; repeated queries
//! for the same term return the same value term.

mod eval;

pub use eval::Evaluator;

use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::fold::default_value;
use oxbit_core::sort::{SortId, SortKind};
use oxbit_core::value::Value;
use oxbit_core::{OxbitError, Result};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Value of a term in a model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelValue {
    /// Boolean, bit-vector, floating-point or rounding-mode value
    Scalar(Value),
    /// Array: a default element plus explicit entries
    Array {
        /// Element at every index without an entry
        default: Box<ModelValue>,
        /// Index/element pairs, no index twice, no element equal to the default
        entries: Vec<(ModelValue, ModelValue)>,
    },
    /// Function: a default result plus explicit points
    Fun {
        /// Result at every point without an entry
        default: Box<ModelValue>,
        /// Argument tuples and results
        entries: Vec<(Vec<ModelValue>, ModelValue)>,
    },
}

impl ModelValue {
    /// Scalar payload
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            ModelValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean payload
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Value::as_bool)
    }

    /// Array with all elements equal to `default`
    #[must_use]
    pub fn constant_array(default: ModelValue) -> Self {
        ModelValue::Array {
            default: Box::new(default),
            entries: Vec::new(),
        }
    }

    /// Array read
    #[must_use]
    pub fn select(&self, index: &ModelValue) -> Option<ModelValue> {
        match self {
            ModelValue::Array { default, entries } => Some(
                entries
                    .iter()
                    .find(|(i, _)| i == index)
                    .map_or_else(|| (**default).clone(), |(_, e)| e.clone()),
            ),
            _ => None,
        }
    }

    /// Array write
    #[must_use]
    pub fn store(&self, index: ModelValue, element: ModelValue) -> Option<ModelValue> {
        match self {
            ModelValue::Array { default, entries } => {
                let mut entries: Vec<_> = entries.iter().filter(|(i, _)| *i != index).cloned().collect();
                if element != **default {
                    entries.push((index, element));
                }
                Some(ModelValue::Array {
                    default: default.clone(),
                    entries,
                })
            }
            _ => None,
        }
    }

    /// Function application
    #[must_use]
    pub fn apply(&self, args: &[ModelValue]) -> Option<ModelValue> {
        match self {
            ModelValue::Fun { default, entries } => Some(
                entries
                    .iter()
                    .find(|(point, _)| point.as_slice() == args)
                    .map_or_else(|| (**default).clone(), |(_, r)| r.clone()),
            ),
            _ => None,
        }
    }

    /// Extensional equality: same default and the same non-default entries
    #[must_use]
    pub fn extensionally_equal(&self, other: &ModelValue) -> bool {
        match (self, other) {
            (ModelValue::Scalar(a), ModelValue::Scalar(b)) => a == b,
            (
                ModelValue::Array { default: da, entries: ea },
                ModelValue::Array { default: db, entries: eb },
            ) => {
                da.extensionally_equal(db)
                    && ea.len() == eb.len()
                    && ea.iter().all(|(i, e)| {
                        eb.iter()
                            .any(|(j, f)| i.extensionally_equal(j) && e.extensionally_equal(f))
                    })
            }
            (ModelValue::Fun { default: da, entries: ea }, ModelValue::Fun { default: db, entries: eb }) => {
                da == db && ea.len() == eb.len() && ea.iter().all(|p| eb.contains(p))
            }
            _ => false,
        }
    }
}

/// Default model value of a sort: the scalar default, or a table whose
/// default is the default of the element or codomain sort
///
/// # Errors
///
/// Never fails for well-formed sorts.
pub fn default_model_value(tm: &TermManager, sort: SortId) -> Result<ModelValue> {
    match &tm.sort(sort).kind {
        SortKind::Array { element, .. } => Ok(ModelValue::constant_array(default_model_value(tm, *element)?)),
        SortKind::Function { codomain, .. } => Ok(ModelValue::Fun {
            default: Box::new(default_model_value(tm, *codomain)?),
            entries: Vec::new(),
        }),
        kind => default_value(kind)
            .map(ModelValue::Scalar)
            .ok_or_else(|| OxbitError::state("sort without default value")),
    }
}

/// Assignment of values to constants
#[derive(Debug, Clone, Default)]
pub struct Model {
    values: FxHashMap<TermId, ModelValue>,
}

impl Model {
    /// Empty model
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of a constant
    pub fn insert(&mut self, constant: TermId, value: ModelValue) {
        self.values.insert(constant, value);
    }

    /// Value of a constant
    #[must_use]
    pub fn get(&self, constant: TermId) -> Option<&ModelValue> {
        self.values.get(&constant)
    }

    /// Does the model assign `constant`
    #[must_use]
    pub fn contains(&self, constant: TermId) -> bool {
        self.values.contains_key(&constant)
    }

    /// Number of assigned constants
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Nothing assigned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All assignments
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &ModelValue)> {
        self.values.iter().map(|(&k, v)| (k, v))
    }
}

/// Answers value queries against a fixed model
#[derive(Debug)]
pub struct ModelOracle {
    model: Model,
    evaluator: Evaluator,
    terms: FxHashMap<TermId, TermId>,
    bound: FxHashMap<(SortId, usize), TermId>,
}

impl ModelOracle {
    /// Oracle over `model`
    #[must_use]
    pub fn new(model: Model) -> Self {
        Self {
            model,
            evaluator: Evaluator::new(),
            terms: FxHashMap::default(),
            bound: FxHashMap::default(),
        }
    }

    /// Underlying model
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Forget the cached value terms; they may have been freed
    pub fn clear_cache(&mut self) {
        self.evaluator.clear();
        self.terms.clear();
        self.bound.clear();
    }

    /// Evaluate `t` to a model value
    ///
    /// # Errors
    ///
    /// Returns an unsupported-feature error for quantifiers over domains too
    /// large to enumerate.
    pub fn eval(&mut self, tm: &TermManager, t: TermId) -> Result<ModelValue> {
        self.evaluator.eval(tm, &self.model, t)
    }

    /// Value of `t` as a value term: a literal for scalars, a store chain
    /// over a constant array for arrays, a lambda for functions
    ///
    /// # Errors
    ///
    /// See [`ModelOracle::eval`].
    pub fn value(&mut self, tm: &mut TermManager, t: TermId) -> Result<TermId> {
        if let Some(&v) = self.terms.get(&t) {
            return Ok(v);
        }
        let mv = self.eval(tm, t)?;
        let sort = tm.sort_of(t);
        let term = self.to_term(tm, &mv, sort)?;
        self.terms.insert(t, term);
        Ok(term)
    }

    /// Build the term representing `value` of sort `sort`
    ///
    /// # Errors
    ///
    /// Fails when `value` does not fit `sort`.
    pub fn to_term(&mut self, tm: &mut TermManager, value: &ModelValue, sort: SortId) -> Result<TermId> {
        let kind = tm.sort(sort).kind.clone();
        match (value, kind) {
            (ModelValue::Scalar(v), _) => tm.mk_value(v.clone()),
            (ModelValue::Array { default, entries }, SortKind::Array { index, element }) => {
                let base = self.to_term(tm, default, element)?;
                let mut acc = tm.mk_const_array(sort, base)?;
                for (i, e) in entries {
                    let it = self.to_term(tm, i, index)?;
                    let et = self.to_term(tm, e, element)?;
                    acc = tm.mk_store(acc, it, et)?;
                }
                Ok(acc)
            }
            (ModelValue::Fun { default, entries }, SortKind::Function { domain, codomain }) => {
                let vars = self.bound_vars(tm, &domain)?;
                let mut body = self.to_term(tm, default, codomain)?;
                for (point, result) in entries.iter().rev() {
                    let mut conds = Vec::with_capacity(point.len());
                    for ((p, &d), &v) in point.iter().zip(domain.iter()).zip(vars.iter()) {
                        let pt = self.to_term(tm, p, d)?;
                        conds.push(tm.mk_eq(v, pt)?);
                    }
                    let cond = tm.mk_and(&conds)?;
                    let r = self.to_term(tm, result, codomain)?;
                    body = tm.mk_ite(cond, r, body)?;
                }
                let mut args: SmallVec<[TermId; 4]> = vars.into_iter().collect();
                args.push(body);
                tm.mk_term(TermKind::Lambda, &args, &[])
            }
            _ => Err(OxbitError::state("model value does not match the sort")),
        }
    }

    fn bound_vars(&mut self, tm: &mut TermManager, domain: &[SortId]) -> Result<Vec<TermId>> {
        let mut vars = Vec::with_capacity(domain.len());
        for (i, &s) in domain.iter().enumerate() {
            let v = match self.bound.get(&(s, i)) {
                Some(&v) => v,
                None => {
                    let v = tm.mk_var(s, Some(&format!("_x{i}")))?;
                    self.bound.insert((s, i), v);
                    v
                }
            };
            vars.push(v);
        }
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxbit_core::value::BitVec;

    fn bv(w: u32, x: u64) -> ModelValue {
        ModelValue::Scalar(Value::BitVec(BitVec::from_u64(w, x)))
    }

    #[test]
    fn test_array_store_normalizes() {
        let a = ModelValue::constant_array(bv(4, 0));
        let b = a.store(bv(4, 1), bv(4, 7)).unwrap();
        assert_eq!(b.select(&bv(4, 1)), Some(bv(4, 7)));
        assert_eq!(b.select(&bv(4, 2)), Some(bv(4, 0)));
        let c = b.store(bv(4, 1), bv(4, 0)).unwrap();
        assert!(c.extensionally_equal(&a));
        assert!(!b.extensionally_equal(&a));
    }

    #[test]
    fn test_value_terms_are_cached() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let arr = tm.mk_array_sort(s, s).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let mut model = Model::new();
        let table = ModelValue::constant_array(bv(4, 3)).store(bv(4, 1), bv(4, 9)).unwrap();
        model.insert(a, table);
        let mut oracle = ModelOracle::new(model);
        let v1 = oracle.value(&mut tm, a).unwrap();
        let v2 = oracle.value(&mut tm, a).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(tm[v1].kind, TermKind::ArrayStore);
        let one = tm.mk_bv_value_u64(s, 1).unwrap();
        let read = tm.mk_select(a, one).unwrap();
        let rv = oracle.value(&mut tm, read).unwrap();
        assert_eq!(rv, tm.mk_bv_value_u64(s, 9).unwrap());
    }

    #[test]
    fn test_function_value_is_lambda() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(4).unwrap();
        let fs = tm.mk_fun_sort(&[s], s).unwrap();
        let f = tm.mk_const(fs, Some("f"));
        let mut model = Model::new();
        model.insert(
            f,
            ModelValue::Fun {
                default: Box::new(bv(4, 0)),
                entries: vec![(vec![bv(4, 2)], bv(4, 5))],
            },
        );
        let mut oracle = ModelOracle::new(model);
        let v = oracle.value(&mut tm, f).unwrap();
        assert_eq!(tm[v].kind, TermKind::Lambda);
        let two = tm.mk_bv_value_u64(s, 2).unwrap();
        let app = tm.mk_apply(f, &[two]).unwrap();
        assert_eq!(oracle.eval(&tm, app).unwrap(), bv(4, 5));
    }
}
