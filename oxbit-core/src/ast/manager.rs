//! Hash-consing term manager
//!
//! Every term lives in an arena owned by one [`TermManager`]. Structurally
//! equal requests (kind, sort, children, indices and payload) return the same
//! [`TermId`]; constants and bound variables are always fresh, their symbol
//! is metadata only.
//!
//! Each construction request counts as one owner of the returned term.
//! Between [`TermManager::begin_internal`] and
//! [`TermManager::end_internal`] requests register no owner; the solver
//! builds its working terms there, so they live only as long as an owned
//! term reaches them. [`TermManager::garbage_collect`] frees every node
//! that is not reachable from an owned node; freed handles stay dangling
//! and are never reused.

use super::kind::TermKind;
use super::term::{Term, TermArgs, TermId, TermKey};
use crate::error::{OxbitError, Result};
use crate::sort::{Sort, SortId, SortKind, SortManager};
use crate::value::{BitVec, FpValue, RoundingMode, Value};
use lasso::{Rodeo, Spur};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::{SmallVec, smallvec};
use std::ops::Index;
use tracing::debug;

#[derive(Debug)]
struct Node {
    term: Term,
    refs: u32,
}

/// Arena of hash-consed terms together with their sorts
#[derive(Debug)]
pub struct TermManager {
    /// Sort table
    pub sorts: SortManager,
    nodes: Vec<Option<Node>>,
    cache: FxHashMap<TermKey, TermId>,
    symbols: Rodeo,
    names: FxHashMap<TermId, Spur>,
    true_term: TermId,
    false_term: TermId,
    fresh_counter: u32,
    internal: u32,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TermManager {
    /// Create an empty manager holding only `true` and `false`
    #[must_use]
    pub fn new() -> Self {
        let mut tm = Self {
            sorts: SortManager::new(),
            nodes: Vec::new(),
            cache: FxHashMap::default(),
            symbols: Rodeo::default(),
            names: FxHashMap::default(),
            true_term: TermId(0),
            false_term: TermId(0),
            fresh_counter: 0,
            internal: 0,
        };
        let bool_sort = tm.sorts.bool_sort;
        tm.true_term = tm.intern(Term {
            kind: TermKind::Value,
            sort: bool_sort,
            args: TermArgs::new(),
            indices: SmallVec::new(),
            value: Some(Value::Bool(true)),
            free_vars: SmallVec::new(),
        });
        tm.false_term = tm.intern(Term {
            kind: TermKind::Value,
            sort: bool_sort,
            args: TermArgs::new(),
            indices: SmallVec::new(),
            value: Some(Value::Bool(false)),
            free_vars: SmallVec::new(),
        });
        tm
    }

    fn intern(&mut self, term: Term) -> TermId {
        let key = TermKey::of(&term);
        if let Some(&id) = self.cache.get(&key) {
            self.retain(id);
            return id;
        }
        let id = self.push(term);
        self.cache.insert(key, id);
        id
    }

    fn push(&mut self, term: Term) -> TermId {
        let id = TermId(self.nodes.len() as u32);
        let refs = u32::from(self.internal == 0);
        self.nodes.push(Some(Node { term, refs }));
        id
    }

    // --- sorts -----------------------------------------------------------

    /// The Boolean sort
    #[must_use]
    pub fn mk_bool_sort(&self) -> SortId {
        self.sorts.bool_sort
    }

    /// The rounding-mode sort
    #[must_use]
    pub fn mk_rm_sort(&self) -> SortId {
        self.sorts.rm_sort
    }

    /// Bit-vector sort
    pub fn mk_bv_sort(&mut self, width: u32) -> Result<SortId> {
        self.sorts.mk_bv(width)
    }

    /// Floating-point sort
    pub fn mk_fp_sort(&mut self, exp: u32, sig: u32) -> Result<SortId> {
        self.sorts.mk_fp(exp, sig)
    }

    /// Array sort
    pub fn mk_array_sort(&mut self, index: SortId, element: SortId) -> Result<SortId> {
        self.sorts.mk_array(index, element)
    }

    /// Function sort
    pub fn mk_fun_sort(&mut self, domain: &[SortId], codomain: SortId) -> Result<SortId> {
        self.sorts.mk_fun(domain, codomain)
    }

    /// Look up a sort
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this manager.
    #[must_use]
    pub fn sort(&self, id: SortId) -> &Sort {
        match self.sorts.get(id) {
            Some(sort) => sort,
            None => panic!("unknown sort handle {}", id.index()),
        }
    }

    // --- queries ---------------------------------------------------------

    /// Look up a live term
    #[must_use]
    pub fn get(&self, id: TermId) -> Option<&Term> {
        self.nodes.get(id.index()).and_then(|n| n.as_ref()).map(|n| &n.term)
    }

    /// Sort of a term
    #[must_use]
    pub fn sort_of(&self, id: TermId) -> SortId {
        self[id].sort
    }

    /// Sort description of a term
    #[must_use]
    pub fn sort_kind(&self, id: TermId) -> &SortKind {
        &self.sort(self[id].sort).kind
    }

    /// Is the term Boolean
    #[must_use]
    pub fn is_bool(&self, id: TermId) -> bool {
        self.sort_of(id) == self.sorts.bool_sort
    }

    /// Bit-vector width of a term
    #[must_use]
    pub fn bv_width(&self, id: TermId) -> Option<u32> {
        self.sort(self[id].sort).bv_width()
    }

    /// Floating-point format of a term
    #[must_use]
    pub fn fp_format(&self, id: TermId) -> Option<(u32, u32)> {
        self.sort(self[id].sort).fp_format()
    }

    /// Is the term a literal value
    #[must_use]
    pub fn is_value(&self, id: TermId) -> bool {
        self.get(id).is_some_and(Term::is_value)
    }

    /// Is the term an uninterpreted constant
    #[must_use]
    pub fn is_const(&self, id: TermId) -> bool {
        self.get(id).is_some_and(Term::is_const)
    }

    /// Is the term a bound variable
    #[must_use]
    pub fn is_var(&self, id: TermId) -> bool {
        self.get(id).is_some_and(Term::is_var)
    }

    /// Literal payload of a value term
    #[must_use]
    pub fn value_of(&self, id: TermId) -> Option<&Value> {
        self.get(id).and_then(|t| t.value.as_ref())
    }

    /// Boolean payload of `true`/`false`
    #[must_use]
    pub fn bool_value(&self, id: TermId) -> Option<bool> {
        self.value_of(id).and_then(Value::as_bool)
    }

    /// Children of a term
    #[must_use]
    pub fn children(&self, id: TermId) -> &[TermId] {
        &self[id].args
    }

    /// Number of live terms
    #[must_use]
    pub fn num_terms(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Whether any term besides the builtin `true`/`false` was ever created
    #[must_use]
    pub fn has_user_terms(&self) -> bool {
        self.nodes.len() > 2
    }

    // --- ownership -------------------------------------------------------

    /// Enter a scope in which construction requests and `retain` register
    /// no owner. Scopes nest.
    pub fn begin_internal(&mut self) {
        self.internal += 1;
    }

    /// Leave the innermost scope opened by [`TermManager::begin_internal`]
    pub fn end_internal(&mut self) {
        self.internal = self.internal.saturating_sub(1);
    }

    /// Whether an internal scope is open
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.internal > 0
    }

    /// Register one more owner of `id`; no-op inside an internal scope
    pub fn retain(&mut self, id: TermId) {
        if self.internal > 0 {
            return;
        }
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.refs = node.refs.saturating_add(1);
        }
    }

    /// Drop one owner of `id`
    pub fn release(&mut self, id: TermId) {
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.refs = node.refs.saturating_sub(1);
        }
    }

    /// Number of outstanding owners of `id` (0 for freed terms)
    #[must_use]
    pub fn ref_count(&self, id: TermId) -> u32 {
        match self.nodes.get(id.index()) {
            Some(Some(node)) => node.refs,
            _ => 0,
        }
    }

    /// Free all terms unreachable from an owned term; returns the number of
    /// freed nodes
    pub fn garbage_collect(&mut self) -> usize {
        let mut marked: FxHashSet<TermId> = FxHashSet::default();
        let mut stack: Vec<TermId> = vec![self.true_term, self.false_term];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node
                && node.refs > 0
            {
                stack.push(TermId(i as u32));
            }
        }
        while let Some(id) = stack.pop() {
            if !marked.insert(id) {
                continue;
            }
            if let Some(term) = self.get(id) {
                stack.extend(term.args.iter().copied());
            }
        }
        let mut freed = 0;
        for i in 0..self.nodes.len() {
            let id = TermId(i as u32);
            if marked.contains(&id) {
                continue;
            }
            if let Some(node) = self.nodes[i].take() {
                let key = TermKey::of(&node.term);
                if self.cache.get(&key) == Some(&id) {
                    self.cache.remove(&key);
                }
                self.names.remove(&id);
                freed += 1;
            }
        }
        debug!(freed, live = self.num_terms(), "garbage collection");
        freed
    }

    // --- symbols ---------------------------------------------------------

    /// Attach a symbol to a term
    pub fn set_symbol(&mut self, id: TermId, symbol: &str) {
        let spur = self.symbols.get_or_intern(symbol);
        self.names.insert(id, spur);
    }

    /// Symbol attached to a term
    #[must_use]
    pub fn symbol(&self, id: TermId) -> Option<&str> {
        self.names.get(&id).map(|s| self.symbols.resolve(s))
    }

    // --- leaves ----------------------------------------------------------

    /// Fresh uninterpreted constant
    pub fn mk_const(&mut self, sort: SortId, symbol: Option<&str>) -> TermId {
        let id = self.push(Term {
            kind: TermKind::Const,
            sort,
            args: TermArgs::new(),
            indices: SmallVec::new(),
            value: None,
            free_vars: SmallVec::new(),
        });
        if let Some(symbol) = symbol {
            self.set_symbol(id, symbol);
        }
        id
    }

    /// Fresh constant named `prefix!N`
    pub fn mk_fresh_const(&mut self, sort: SortId, prefix: &str) -> TermId {
        self.fresh_counter += 1;
        let name = format!("{prefix}!{}", self.fresh_counter);
        self.mk_const(sort, Some(&name))
    }

    /// Fresh bound variable
    pub fn mk_var(&mut self, sort: SortId, symbol: Option<&str>) -> Result<TermId> {
        if self.sort(sort).is_fun() {
            return Err(OxbitError::type_error("variables must not have a function sort"));
        }
        let next = TermId(self.nodes.len() as u32);
        let id = self.push(Term {
            kind: TermKind::Var,
            sort,
            args: TermArgs::new(),
            indices: SmallVec::new(),
            value: None,
            free_vars: smallvec![next],
        });
        if let Some(symbol) = symbol {
            self.set_symbol(id, symbol);
        }
        Ok(id)
    }

    /// Fresh bound variable named `prefix!N`
    pub fn mk_fresh_var(&mut self, sort: SortId, prefix: &str) -> Result<TermId> {
        self.fresh_counter += 1;
        let name = format!("{prefix}!{}", self.fresh_counter);
        self.mk_var(sort, Some(&name))
    }

    /// Value term for a literal
    pub fn mk_value(&mut self, value: Value) -> Result<TermId> {
        let sort = match &value {
            Value::Bool(true) => {
                self.retain(self.true_term);
                return Ok(self.true_term);
            }
            Value::Bool(false) => {
                self.retain(self.false_term);
                return Ok(self.false_term);
            }
            Value::BitVec(bv) => self.sorts.mk_bv(bv.width())?,
            Value::Fp(fp) => self.sorts.mk_fp(fp.eb(), fp.sb())?,
            Value::Rm(_) => self.sorts.rm_sort,
        };
        Ok(self.intern(Term {
            kind: TermKind::Value,
            sort,
            args: TermArgs::new(),
            indices: SmallVec::new(),
            value: Some(value),
            free_vars: SmallVec::new(),
        }))
    }

    /// `true`
    pub fn mk_true(&mut self) -> TermId {
        self.retain(self.true_term);
        self.true_term
    }

    /// `false`
    pub fn mk_false(&mut self) -> TermId {
        self.retain(self.false_term);
        self.false_term
    }

    /// `true` or `false`
    pub fn mk_bool(&mut self, b: bool) -> TermId {
        if b { self.mk_true() } else { self.mk_false() }
    }

    fn bv_sort_width(&self, sort: SortId) -> Result<u32> {
        self.sorts
            .get(sort)
            .and_then(Sort::bv_width)
            .ok_or_else(|| OxbitError::type_error("expected a bit-vector sort"))
    }

    fn fp_sort_format(&self, sort: SortId) -> Result<(u32, u32)> {
        self.sorts
            .get(sort)
            .and_then(Sort::fp_format)
            .ok_or_else(|| OxbitError::type_error("expected a floating-point sort"))
    }

    /// Bit-vector value from a string in base 2, 10 or 16
    pub fn mk_bv_value(&mut self, sort: SortId, value: &str, base: u32) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::from_str_radix(w, value, base)?))
    }

    /// Bit-vector value from a `u64`, truncated to the sort width
    pub fn mk_bv_value_u64(&mut self, sort: SortId, value: u64) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::from_u64(w, value)))
    }

    /// Bit-vector zero
    pub fn mk_bv_zero(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::zero(w)))
    }

    /// Bit-vector one
    pub fn mk_bv_one(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::one(w)))
    }

    /// Bit-vector of all ones
    pub fn mk_bv_ones(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::ones(w)))
    }

    /// Smallest signed bit-vector value
    pub fn mk_bv_min_signed(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::min_signed(w)))
    }

    /// Largest signed bit-vector value
    pub fn mk_bv_max_signed(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.bv_sort_width(sort)?;
        self.mk_value(Value::BitVec(BitVec::max_signed(w)))
    }

    /// Floating-point value from sign, exponent and significand value terms
    pub fn mk_fp_value(&mut self, sign: TermId, exp: TermId, sig: TermId) -> Result<TermId> {
        let get = |tm: &Self, t: TermId| {
            tm.value_of(t)
                .and_then(Value::as_bv)
                .cloned()
                .ok_or_else(|| OxbitError::value("expected a bit-vector value"))
        };
        let (s, e, m) = (get(self, sign)?, get(self, exp)?, get(self, sig)?);
        self.mk_value(Value::Fp(FpValue::from_triple(&s, &e, &m)?))
    }

    /// `+0`
    pub fn mk_fp_pos_zero(&mut self, sort: SortId) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::zero(e, s, false)))
    }

    /// `-0`
    pub fn mk_fp_neg_zero(&mut self, sort: SortId) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::zero(e, s, true)))
    }

    /// `+oo`
    pub fn mk_fp_pos_inf(&mut self, sort: SortId) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::inf(e, s, false)))
    }

    /// `-oo`
    pub fn mk_fp_neg_inf(&mut self, sort: SortId) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::inf(e, s, true)))
    }

    /// NaN
    pub fn mk_fp_nan(&mut self, sort: SortId) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::nan(e, s)))
    }

    /// Floating-point value rounded from a decimal string
    pub fn mk_fp_value_from_real(&mut self, sort: SortId, rm: RoundingMode, real: &str) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::from_real_str(e, s, rm, real)?))
    }

    /// Floating-point value rounded from the quotient of two decimal strings
    pub fn mk_fp_value_from_rational(
        &mut self,
        sort: SortId,
        rm: RoundingMode,
        num: &str,
        den: &str,
    ) -> Result<TermId> {
        let (e, s) = self.fp_sort_format(sort)?;
        self.mk_value(Value::Fp(FpValue::from_rational_str(e, s, rm, num, den)?))
    }

    /// Rounding-mode value
    pub fn mk_rm_value(&mut self, rm: RoundingMode) -> TermId {
        let sort = self.sorts.rm_sort;
        self.intern(Term {
            kind: TermKind::Value,
            sort,
            args: TermArgs::new(),
            indices: SmallVec::new(),
            value: Some(Value::Rm(rm)),
            free_vars: SmallVec::new(),
        })
    }

    /// Constant array of sort `sort` mapping every index to `value`
    pub fn mk_const_array(&mut self, sort: SortId, value: TermId) -> Result<TermId> {
        let Some((_, element)) = self.sort(sort).array_sorts() else {
            return Err(OxbitError::type_error("const-array needs an array sort"));
        };
        if self.sort_of(value) != element {
            return Err(OxbitError::type_error(
                "const-array value does not match the element sort",
            ));
        }
        let free_vars = self[value].free_vars.clone();
        Ok(self.intern(Term {
            kind: TermKind::ConstArray,
            sort,
            args: smallvec![value],
            indices: SmallVec::new(),
            value: None,
            free_vars,
        }))
    }

    // --- operators -------------------------------------------------------

    /// Build `kind(args)[indices]`, type checking the operands.
    ///
    /// Chainable kinds accept more than two operands: associative operators
    /// are folded to the left, `=>` to the right, and chained comparisons
    /// become a conjunction of adjacent pairs. Binders take any number of
    /// bound variables followed by the body and nest one binder per variable.
    pub fn mk_term(&mut self, kind: TermKind, args: &[TermId], indices: &[u32]) -> Result<TermId> {
        use TermKind::*;
        for &a in args {
            if self.get(a).is_none() {
                return Err(OxbitError::type_error(format!("dangling term handle {a}")));
            }
        }
        let (min, max) = kind.arity();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            return Err(OxbitError::type_error(format!(
                "'{kind}' applied to {} arguments",
                args.len()
            )));
        }
        if indices.len() != kind.num_indices() {
            return Err(OxbitError::type_error(format!(
                "'{kind}' expects {} indices, got {}",
                kind.num_indices(),
                indices.len()
            )));
        }
        match kind {
            Const | Var | Value => {
                return Err(OxbitError::type_error(format!(
                    "'{kind}' terms are built by their dedicated constructors"
                )));
            }
            ConstArray => {
                return Err(OxbitError::type_error("use mk_const_array to build constant arrays"));
            }
            Xor | BvAnd | BvOr | BvXor | BvAdd | BvMul | BvConcat if args.len() > 2 => {
                let mut acc = self.mk_term(kind, &args[..2], &[])?;
                for &a in &args[2..] {
                    acc = self.mk_term(kind, &[acc, a], &[])?;
                }
                return Ok(acc);
            }
            Implies if args.len() > 2 => {
                let n = args.len();
                let mut acc = self.mk_term(Implies, &args[n - 2..], &[])?;
                for &a in args[..n - 2].iter().rev() {
                    acc = self.mk_term(Implies, &[a, acc], &[])?;
                }
                return Ok(acc);
            }
            Equal | FpEqual | FpLt | FpLeq | FpGt | FpGeq if args.len() > 2 => {
                let mut pairs = Vec::with_capacity(args.len() - 1);
                for w in args.windows(2) {
                    pairs.push(self.mk_term(kind, w, &[])?);
                }
                return self.mk_term(And, &pairs, &[]);
            }
            Lambda | Forall | Exists if args.len() > 2 => {
                let n = args.len();
                let mut acc = self.mk_term(kind, &args[n - 2..], &[])?;
                for &v in args[..n - 2].iter().rev() {
                    acc = self.mk_term(kind, &[v, acc], &[])?;
                }
                return Ok(acc);
            }
            _ => {}
        }
        let sort = self.compute_sort(kind, args, indices)?;
        let mut free_vars: SmallVec<[TermId; 2]> = SmallVec::new();
        for &a in args {
            for &v in &self[a].free_vars {
                if let Err(pos) = free_vars.binary_search(&v) {
                    free_vars.insert(pos, v);
                }
            }
        }
        if kind.is_binder() {
            free_vars.retain(|v| *v != args[0]);
        }
        Ok(self.intern(Term {
            kind,
            sort,
            args: args.iter().copied().collect(),
            indices: indices.iter().copied().collect(),
            value: None,
            free_vars,
        }))
    }

    fn compute_sort(&mut self, kind: TermKind, args: &[TermId], indices: &[u32]) -> Result<SortId> {
        use TermKind::*;
        let bool_sort = self.sorts.bool_sort;
        let sorts: SmallVec<[SortId; 4]> = args.iter().map(|&a| self.sort_of(a)).collect();
        let err = |msg: &str| OxbitError::type_error(format!("'{kind}': {msg}"));
        let all_same = || sorts.windows(2).all(|w| w[0] == w[1]);
        let width = |tm: &Self, i: usize| tm.sort(sorts[i]).bv_width();
        let format = |tm: &Self, i: usize| tm.sort(sorts[i]).fp_format();
        let is_rm = |tm: &Self, i: usize| tm.sort(sorts[i]).is_rm();

        match kind {
            Not | And | Or | Xor | Implies | Iff => {
                if sorts.iter().any(|&s| s != bool_sort) {
                    return Err(err("expected Boolean operands"));
                }
                Ok(bool_sort)
            }
            Ite => {
                if sorts[0] != bool_sort {
                    return Err(err("condition must be Boolean"));
                }
                if sorts[1] != sorts[2] {
                    return Err(err("branches must have the same sort"));
                }
                Ok(sorts[1])
            }
            Equal | Distinct => {
                if !all_same() {
                    return Err(err("operands must have the same sort"));
                }
                if self.sort(sorts[0]).is_fun() {
                    return Err(err("equality over function sorts is not supported"));
                }
                Ok(bool_sort)
            }
            BvNot | BvNeg | BvInc | BvDec | BvAnd | BvOr | BvXor | BvNand | BvNor | BvXnor
            | BvAdd | BvSub | BvMul | BvUdiv | BvUrem | BvSdiv | BvSrem | BvSmod | BvShl
            | BvShr | BvAshr | BvRol | BvRor => {
                if width(self, 0).is_none() || !all_same() {
                    return Err(err("expected bit-vector operands of equal width"));
                }
                Ok(sorts[0])
            }
            BvUlt | BvUle | BvUgt | BvUge | BvSlt | BvSle | BvSgt | BvSge | BvUaddo | BvSaddo
            | BvUsubo | BvSsubo | BvUmulo | BvSmulo | BvSdivo => {
                if width(self, 0).is_none() || !all_same() {
                    return Err(err("expected bit-vector operands of equal width"));
                }
                Ok(bool_sort)
            }
            BvComp => {
                if width(self, 0).is_none() || !all_same() {
                    return Err(err("expected bit-vector operands of equal width"));
                }
                self.sorts.mk_bv(1)
            }
            BvRedand | BvRedor | BvRedxor => {
                width(self, 0).ok_or_else(|| err("expected a bit-vector operand"))?;
                self.sorts.mk_bv(1)
            }
            BvConcat => {
                let a = width(self, 0).ok_or_else(|| err("expected bit-vector operands"))?;
                let b = width(self, 1).ok_or_else(|| err("expected bit-vector operands"))?;
                self.sorts.mk_bv(a + b)
            }
            BvExtract => {
                let w = width(self, 0).ok_or_else(|| err("expected a bit-vector operand"))?;
                let (hi, lo) = (indices[0], indices[1]);
                if hi >= w || lo > hi {
                    return Err(err(&format!("invalid bounds [{hi}:{lo}] for width {w}")));
                }
                self.sorts.mk_bv(hi - lo + 1)
            }
            BvZeroExtend | BvSignExtend => {
                let w = width(self, 0).ok_or_else(|| err("expected a bit-vector operand"))?;
                let n = indices[0];
                w.checked_add(n)
                    .ok_or_else(|| err("extension overflows the maximum width"))
                    .and_then(|w| self.sorts.mk_bv(w))
            }
            BvRepeat => {
                let w = width(self, 0).ok_or_else(|| err("expected a bit-vector operand"))?;
                if indices[0] == 0 {
                    return Err(err("repeat count must be > 0"));
                }
                w.checked_mul(indices[0])
                    .ok_or_else(|| err("repetition overflows the maximum width"))
                    .and_then(|w| self.sorts.mk_bv(w))
            }
            BvRoli | BvRori => {
                width(self, 0).ok_or_else(|| err("expected a bit-vector operand"))?;
                Ok(sorts[0])
            }
            FpAbs | FpNeg | FpRem | FpMin | FpMax => {
                if format(self, 0).is_none() || !all_same() {
                    return Err(err("expected floating-point operands of equal format"));
                }
                Ok(sorts[0])
            }
            FpEqual | FpLt | FpLeq | FpGt | FpGeq | FpIsNormal | FpIsSubnormal | FpIsZero
            | FpIsInf | FpIsNan | FpIsNeg | FpIsPos => {
                if format(self, 0).is_none() || !all_same() {
                    return Err(err("expected floating-point operands of equal format"));
                }
                Ok(bool_sort)
            }
            FpAdd | FpSub | FpMul | FpDiv | FpFma | FpSqrt | FpRti => {
                if !is_rm(self, 0) {
                    return Err(err("first operand must be a rounding mode"));
                }
                if format(self, 1).is_none() || !sorts[1..].windows(2).all(|w| w[0] == w[1]) {
                    return Err(err("expected floating-point operands of equal format"));
                }
                Ok(sorts[1])
            }
            FpFp => {
                let s = width(self, 0);
                let e = width(self, 1);
                let m = width(self, 2);
                match (s, e, m) {
                    (Some(1), Some(e), Some(m)) => self.sorts.mk_fp(e, m + 1),
                    _ => Err(err("expected bit-vectors of widths 1, eb and sb-1")),
                }
            }
            FpToFpFromBv => {
                let w = width(self, 0).ok_or_else(|| err("expected a bit-vector operand"))?;
                if indices[0].checked_add(indices[1]) != Some(w) {
                    return Err(err("bit-vector width must equal eb + sb"));
                }
                self.sorts.mk_fp(indices[0], indices[1])
            }
            FpToFpFromFp => {
                if !is_rm(self, 0) || format(self, 1).is_none() {
                    return Err(err("expected a rounding mode and a floating-point operand"));
                }
                self.sorts.mk_fp(indices[0], indices[1])
            }
            FpToFpFromSbv | FpToFpFromUbv => {
                if !is_rm(self, 0) || width(self, 1).is_none() {
                    return Err(err("expected a rounding mode and a bit-vector operand"));
                }
                self.sorts.mk_fp(indices[0], indices[1])
            }
            FpToSbv | FpToUbv => {
                if !is_rm(self, 0) || format(self, 1).is_none() {
                    return Err(err("expected a rounding mode and a floating-point operand"));
                }
                self.sorts.mk_bv(indices[0])
            }
            ArraySelect => {
                let (index, element) = self
                    .sort(sorts[0])
                    .array_sorts()
                    .ok_or_else(|| err("first operand must be an array"))?;
                if sorts[1] != index {
                    return Err(err("index sort mismatch"));
                }
                Ok(element)
            }
            ArrayStore => {
                let (index, element) = self
                    .sort(sorts[0])
                    .array_sorts()
                    .ok_or_else(|| err("first operand must be an array"))?;
                if sorts[1] != index || sorts[2] != element {
                    return Err(err("index or element sort mismatch"));
                }
                Ok(sorts[0])
            }
            Apply => {
                let (domain, codomain) = self
                    .sort(sorts[0])
                    .fun_sorts()
                    .ok_or_else(|| err("first operand must be a function"))?;
                if domain != &sorts[1..] {
                    return Err(err("argument sorts do not match the function domain"));
                }
                Ok(codomain)
            }
            Lambda => {
                if !self.is_var(args[0]) {
                    return Err(err("expected a bound variable"));
                }
                let body = self.sort(sorts[1]).clone();
                match body.fun_sorts() {
                    Some((domain, codomain)) => {
                        let mut d: SmallVec<[SortId; 4]> = smallvec![sorts[0]];
                        d.extend_from_slice(domain);
                        self.sorts.mk_fun(&d, codomain)
                    }
                    None => self.sorts.mk_fun(&[sorts[0]], sorts[1]),
                }
            }
            Forall | Exists => {
                if !self.is_var(args[0]) {
                    return Err(err("expected a bound variable"));
                }
                let var_sort = self.sort(sorts[0]);
                if var_sort.is_array() || var_sort.is_fun() {
                    return Err(err("quantified variables must be of a scalar sort"));
                }
                if sorts[1] != bool_sort {
                    return Err(err("body must be Boolean"));
                }
                Ok(bool_sort)
            }
            Const | Var | Value | ConstArray => Err(err("not an operator")),
        }
    }

    // --- convenience -----------------------------------------------------

    /// `not t`
    pub fn mk_not(&mut self, t: TermId) -> Result<TermId> {
        self.mk_term(TermKind::Not, &[t], &[])
    }

    /// Conjunction; `true` for no operand, the operand itself for one
    pub fn mk_and(&mut self, args: &[TermId]) -> Result<TermId> {
        match args {
            [] => Ok(self.mk_true()),
            [a] => {
                self.retain(*a);
                Ok(*a)
            }
            _ => self.mk_term(TermKind::And, args, &[]),
        }
    }

    /// Disjunction; `false` for no operand, the operand itself for one
    pub fn mk_or(&mut self, args: &[TermId]) -> Result<TermId> {
        match args {
            [] => Ok(self.mk_false()),
            [a] => {
                self.retain(*a);
                Ok(*a)
            }
            _ => self.mk_term(TermKind::Or, args, &[]),
        }
    }

    /// `a => b`
    pub fn mk_implies(&mut self, a: TermId, b: TermId) -> Result<TermId> {
        self.mk_term(TermKind::Implies, &[a, b], &[])
    }

    /// `a = b`
    pub fn mk_eq(&mut self, a: TermId, b: TermId) -> Result<TermId> {
        self.mk_term(TermKind::Equal, &[a, b], &[])
    }

    /// `ite c t e`
    pub fn mk_ite(&mut self, c: TermId, t: TermId, e: TermId) -> Result<TermId> {
        self.mk_term(TermKind::Ite, &[c, t, e], &[])
    }

    /// `select a i`
    pub fn mk_select(&mut self, a: TermId, i: TermId) -> Result<TermId> {
        self.mk_term(TermKind::ArraySelect, &[a, i], &[])
    }

    /// `store a i e`
    pub fn mk_store(&mut self, a: TermId, i: TermId, e: TermId) -> Result<TermId> {
        self.mk_term(TermKind::ArrayStore, &[a, i, e], &[])
    }

    /// Function application `f(args)`
    pub fn mk_apply(&mut self, f: TermId, args: &[TermId]) -> Result<TermId> {
        let mut all: SmallVec<[TermId; 4]> = smallvec![f];
        all.extend_from_slice(args);
        self.mk_term(TermKind::Apply, &all, &[])
    }

    /// Rebuild a term of the same shape over new children
    pub fn rebuild(&mut self, id: TermId, args: &[TermId]) -> Result<TermId> {
        let term = &self[id];
        let (kind, sort) = (term.kind, term.sort);
        let indices: SmallVec<[u32; 2]> = term.indices.clone();
        if term.args.as_slice() == args {
            self.retain(id);
            return Ok(id);
        }
        match kind {
            TermKind::ConstArray => self.mk_const_array(sort, args[0]),
            TermKind::Const | TermKind::Var | TermKind::Value => {
                self.retain(id);
                Ok(id)
            }
            _ => self.mk_term(kind, args, &indices),
        }
    }
}

impl Index<TermId> for TermManager {
    type Output = Term;

    /// # Panics
    ///
    /// Panics on a dangling handle; use [`TermManager::get`] to check first.
    fn index(&self, id: TermId) -> &Term {
        match self.get(id) {
            Some(term) => term,
            None => panic!("dangling term handle {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let one = tm.mk_bv_one(bv8).unwrap();
        let a = tm.mk_term(TermKind::BvAdd, &[x, one], &[]).unwrap();
        let b = tm.mk_term(TermKind::BvAdd, &[x, one], &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(tm.ref_count(a), 2);
        assert_eq!(tm.ref_count(x), 1);
    }

    #[test]
    fn test_consts_are_fresh() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x1 = tm.mk_const(bv8, Some("x"));
        let x2 = tm.mk_const(bv8, Some("x"));
        assert_ne!(x1, x2);
        assert_eq!(tm.symbol(x1), Some("x"));
    }

    #[test]
    fn test_type_errors() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv4, None);
        assert!(tm.mk_term(TermKind::BvUlt, &[x, y], &[]).unwrap_err().is_type_error());
        assert!(tm.mk_term(TermKind::BvExtract, &[x], &[8, 0]).is_err());
        assert!(tm.mk_term(TermKind::Not, &[x], &[]).is_err());
        assert!(tm.mk_term(TermKind::And, &[x], &[]).is_err());
    }

    #[test]
    fn test_nary_folding() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let (a, b, c) = (
            tm.mk_const(bv8, None),
            tm.mk_const(bv8, None),
            tm.mk_const(bv8, None),
        );
        let sum = tm.mk_term(TermKind::BvAdd, &[a, b, c], &[]).unwrap();
        assert_eq!(tm[sum].args.len(), 2);
        let eq = tm.mk_term(TermKind::Equal, &[a, b, c], &[]).unwrap();
        assert_eq!(tm[eq].kind, TermKind::And);
    }

    #[test]
    fn test_binders() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_var(bv8, Some("x")).unwrap();
        let y = tm.mk_var(bv8, Some("y")).unwrap();
        let body = tm.mk_term(TermKind::BvAdd, &[x, y], &[]).unwrap();
        assert_eq!(tm[body].free_vars.len(), 2);
        let f = tm.mk_term(TermKind::Lambda, &[x, y, body], &[]).unwrap();
        assert!(tm[f].is_ground());
        let (domain, _) = tm.sort(tm.sort_of(f)).fun_sorts().unwrap();
        assert_eq!(domain.len(), 2);
    }

    #[test]
    fn test_garbage_collect() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let before = tm.num_terms();
        let x = tm.mk_const(bv8, None);
        let n = tm.mk_term(TermKind::BvNeg, &[x], &[]).unwrap();
        tm.release(x);
        assert_eq!(tm.garbage_collect(), 0);
        tm.release(n);
        assert_eq!(tm.garbage_collect(), 2);
        assert_eq!(tm.num_terms(), before);
        assert!(tm.get(n).is_none());
    }

    #[test]
    fn test_internal_scope_registers_no_owners() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, None);
        let before = tm.num_terms();
        tm.begin_internal();
        let n = tm.mk_term(TermKind::BvNeg, &[x], &[]).unwrap();
        let again = tm.mk_term(TermKind::BvNeg, &[x], &[]).unwrap();
        let fresh = tm.mk_const(bv8, None);
        tm.retain(x);
        tm.end_internal();
        assert_eq!(n, again);
        assert_eq!(tm.ref_count(n), 0);
        assert_eq!(tm.ref_count(fresh), 0);
        assert_eq!(tm.ref_count(x), 1);
        assert!(!tm.is_internal());

        // a user request for the same term takes ownership
        let owned = tm.mk_term(TermKind::BvNeg, &[x], &[]).unwrap();
        assert_eq!(owned, n);
        assert_eq!(tm.ref_count(n), 1);
        assert_eq!(tm.garbage_collect(), 1);
        assert!(tm.get(fresh).is_none());
        assert_eq!(tm.num_terms(), before + 1);
    }
}
