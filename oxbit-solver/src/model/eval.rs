//! Term evaluation under a model
//!
//! Scalar operators go through the shared constant folder, so evaluation
//! agrees with the rewriter bit for bit. Quantifiers are evaluated by
//! enumerating the domain of the bound variable, which is only feasible for
//! small sorts.

use super::{Model, ModelValue, default_model_value};
use oxbit_core::ast::{TermId, TermKind, TermManager};
use oxbit_core::fold::{fold, value_from_bits};
use oxbit_core::sort::SortKind;
use oxbit_core::value::Value;
use oxbit_core::{OxbitError, Result};
use rustc_hash::FxHashMap;

/// Largest domain a quantified variable may range over during evaluation
const MAX_DOMAIN_BITS: u32 = 12;

type Env = Vec<(TermId, ModelValue)>;

/// Evaluator with a cache for ground terms
#[derive(Debug, Default)]
pub struct Evaluator {
    cache: FxHashMap<TermId, ModelValue>,
}

impl Evaluator {
    /// Evaluator with an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached results, needed before switching models
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Value of the ground term `t` under `model`; unassigned constants take
    /// the default value of their sort
    ///
    /// # Errors
    ///
    /// Fails for free variables and for quantifiers over large domains.
    pub fn eval(&mut self, tm: &TermManager, model: &Model, t: TermId) -> Result<ModelValue> {
        let mut env = Env::new();
        self.eval_env(tm, model, t, &mut env)
    }

    fn eval_env(&mut self, tm: &TermManager, model: &Model, root: TermId, env: &mut Env) -> Result<ModelValue> {
        let mut local: FxHashMap<TermId, ModelValue> = FxHashMap::default();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if local.contains_key(&id) {
                continue;
            }
            let term = &tm[id];
            let ground = term.free_vars.is_empty();
            if ground && let Some(v) = self.cache.get(&id) {
                local.insert(id, v.clone());
                continue;
            }
            if !expanded {
                stack.push((id, true));
                for &c in operands(tm, id) {
                    if !local.contains_key(&c) {
                        stack.push((c, false));
                    }
                }
                continue;
            }
            let v = self.eval_node(tm, model, id, &local, env)?;
            if ground {
                self.cache.insert(id, v.clone());
            }
            local.insert(id, v);
        }
        local
            .remove(&root)
            .ok_or_else(|| OxbitError::state(format!("{root} was not evaluated")))
    }

    fn eval_node(
        &mut self,
        tm: &TermManager,
        model: &Model,
        id: TermId,
        local: &FxHashMap<TermId, ModelValue>,
        env: &mut Env,
    ) -> Result<ModelValue> {
        use TermKind as K;
        let term = &tm[id];
        let arg = |i: usize| -> Result<&ModelValue> {
            local
                .get(&term.args[i])
                .ok_or_else(|| OxbitError::state("operand was not evaluated"))
        };
        match term.kind {
            K::Value => term
                .value
                .clone()
                .map(ModelValue::Scalar)
                .ok_or_else(|| OxbitError::state("value term without payload")),
            K::Const => match model.get(id) {
                Some(v) => Ok(v.clone()),
                None => default_model_value(tm, term.sort),
            },
            K::Var => env
                .iter()
                .rev()
                .find(|(v, _)| *v == id)
                .map(|(_, val)| val.clone())
                .ok_or_else(|| OxbitError::unsupported("evaluation of a free variable")),
            K::Ite => {
                let c = arg(0)?.as_bool().ok_or_else(|| OxbitError::state("non-Boolean condition"))?;
                Ok(arg(if c { 1 } else { 2 })?.clone())
            }
            K::Equal | K::Distinct if !is_scalar(tm.sort_kind(term.args[0])) => {
                let vals: Vec<&ModelValue> = (0..term.args.len()).map(arg).collect::<Result<_>>()?;
                let r = if term.kind == K::Equal {
                    vals.windows(2).all(|w| w[0].extensionally_equal(w[1]))
                } else {
                    (0..vals.len()).all(|i| (i + 1..vals.len()).all(|j| !vals[i].extensionally_equal(vals[j])))
                };
                Ok(ModelValue::Scalar(Value::Bool(r)))
            }
            K::ArraySelect => arg(0)?
                .select(arg(1)?)
                .ok_or_else(|| OxbitError::state("select on a non-array value")),
            K::ArrayStore => arg(0)?
                .store(arg(1)?.clone(), arg(2)?.clone())
                .ok_or_else(|| OxbitError::state("store on a non-array value")),
            K::ConstArray => Ok(ModelValue::constant_array(arg(0)?.clone())),
            K::Apply => {
                let args: Vec<ModelValue> = (1..term.args.len()).map(|i| arg(i).cloned()).collect::<Result<_>>()?;
                self.apply(tm, model, term.args[0], &args, env)
            }
            K::Lambda => Err(OxbitError::unsupported("evaluation of an unapplied lambda")),
            K::Forall | K::Exists => {
                let var = term.args[0];
                let body = term.args[1];
                let want = term.kind == K::Exists;
                for value in domain(tm.sort_kind(var))? {
                    env.push((var, ModelValue::Scalar(value)));
                    let r = self.eval_env(tm, model, body, env);
                    env.pop();
                    if r?.as_bool() == Some(want) {
                        return Ok(ModelValue::Scalar(Value::Bool(want)));
                    }
                }
                Ok(ModelValue::Scalar(Value::Bool(!want)))
            }
            kind => {
                let mut vals = Vec::with_capacity(term.args.len());
                for i in 0..term.args.len() {
                    let v = arg(i)?
                        .as_scalar()
                        .ok_or_else(|| OxbitError::state(format!("'{kind}' applied to a non-scalar value")))?;
                    vals.push(v.clone());
                }
                fold(kind, &term.indices, &vals)
                    .map(ModelValue::Scalar)
                    .ok_or_else(|| OxbitError::state(format!("cannot fold '{kind}'")))
            }
        }
    }

    fn apply(
        &mut self,
        tm: &TermManager,
        model: &Model,
        f: TermId,
        args: &[ModelValue],
        env: &mut Env,
    ) -> Result<ModelValue> {
        let head = &tm[f];
        match head.kind {
            TermKind::Lambda => {
                let mut body = f;
                let depth = env.len();
                for a in args {
                    let t = &tm[body];
                    if t.kind != TermKind::Lambda {
                        env.truncate(depth);
                        return Err(OxbitError::state("lambda applied to too many arguments"));
                    }
                    env.push((t.args[0], a.clone()));
                    body = t.args[1];
                }
                let r = self.eval_env(tm, model, body, env);
                env.truncate(depth);
                r
            }
            TermKind::Ite => {
                let c = self.eval_env(tm, model, head.args[0], env)?;
                let branch = if c.as_bool() == Some(true) { head.args[1] } else { head.args[2] };
                self.apply(tm, model, branch, args, env)
            }
            _ => {
                let table = self.eval_env(tm, model, f, env)?;
                table
                    .apply(args)
                    .ok_or_else(|| OxbitError::state("application of a non-function value"))
            }
        }
    }
}

/// Children that must be evaluated before the node itself
fn operands(tm: &TermManager, id: TermId) -> &[TermId] {
    let term = &tm[id];
    match term.kind {
        TermKind::Lambda | TermKind::Forall | TermKind::Exists => &[],
        TermKind::Apply => &term.args[1..],
        _ => &term.args,
    }
}

fn is_scalar(kind: &SortKind) -> bool {
    !matches!(kind, SortKind::Array { .. } | SortKind::Function { .. })
}

fn domain(kind: &SortKind) -> Result<Vec<Value>> {
    let bits = match kind {
        SortKind::Bool => 1,
        SortKind::BitVec(w) => *w,
        SortKind::FloatingPoint { exp, sig } => exp + sig,
        SortKind::RoundingMode => {
            return Ok(oxbit_core::value::RoundingMode::ALL.iter().map(|&rm| Value::Rm(rm)).collect());
        }
        SortKind::Array { .. } | SortKind::Function { .. } => {
            return Err(OxbitError::unsupported("quantification over a non-scalar sort"));
        }
    };
    if bits > MAX_DOMAIN_BITS {
        return Err(OxbitError::unsupported(format!(
            "cannot enumerate a {bits}-bit quantifier domain"
        )));
    }
    let mut out = Vec::with_capacity(1 << bits);
    for n in 0u64..(1u64 << bits) {
        let raw: Vec<bool> = (0..bits).map(|i| n >> i & 1 == 1).collect();
        if let Some(v) = value_from_bits(kind, &raw) {
            out.push(v);
        }
    }
    Ok(out)
}
