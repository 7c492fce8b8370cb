//! Propagation-based local search on the bit level
//!
//! Roots are blasted into an AIG and the search flips AIG inputs: from an
//! unsatisfied root the target value is pushed through AND gates, choosing
//! a controlling child when the gate must become true and any child when it
//! must become false, until an input is reached.

use super::Engine;
use super::aig::{Aig, AigEdge, AigNode, edge_value};
use super::blast::{Blaster, decode};
use super::prop::is_word_level;
use crate::model::{Model, ModelValue, default_model_value};
use crate::options::Options;
use crate::result::SatResult;
use crate::terminate::TerminationMonitor;
use oxbit_core::ast::{TermId, TermManager};
use oxbit_core::{OxbitError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Bit-level local search engine
#[derive(Debug)]
pub struct AigPropEngine {
    aig: Aig,
    blaster: Blaster,
    roots: Vec<TermId>,
    root_edges: Vec<AigEdge>,
    inputs: Vec<bool>,
    rng: StdRng,
    nprops: u64,
    props: u64,
    last: Option<SatResult>,
}

impl AigPropEngine {
    /// Engine configured from the solver options
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            aig: Aig::new(),
            blaster: Blaster::new(),
            roots: Vec::new(),
            root_edges: Vec::new(),
            inputs: Vec::new(),
            rng: StdRng::seed_from_u64(options.seed),
            nprops: options.aigprop_nprops,
            props: 0,
            last: None,
        }
    }

    /// Propagation steps of the last check
    #[must_use]
    pub fn props(&self) -> u64 {
        self.props
    }

    fn simulate(&self) -> Vec<bool> {
        self.aig
            .simulate(|node| self.inputs.get(node as usize).copied().unwrap_or(false))
    }

    fn propagate(&mut self, values: &[bool], root: AigEdge) {
        let mut edge = root;
        let mut target = true;
        loop {
            let node = edge.node();
            let want = target ^ edge.is_complemented();
            match self.aig.node(node) {
                AigNode::False => return,
                AigNode::Input => {
                    self.inputs[node as usize] = want;
                    return;
                }
                AigNode::And(a, b) => {
                    self.props += 1;
                    let next = if want {
                        // every false child must become true
                        match (edge_value(values, a), edge_value(values, b)) {
                            (false, true) => a,
                            (true, false) => b,
                            _ => {
                                if self.rng.random_bool(0.5) {
                                    a
                                } else {
                                    b
                                }
                            }
                        }
                    } else if self.rng.random_bool(0.5) {
                        a
                    } else {
                        b
                    };
                    edge = next;
                    target = want;
                }
            }
        }
    }
}

impl Engine for AigPropEngine {
    fn name(&self) -> &'static str {
        "aigprop"
    }

    fn reset_roots(&mut self) {
        self.roots.clear();
        self.root_edges.clear();
        self.last = None;
    }

    fn try_assert(&mut self, tm: &mut TermManager, root: TermId) -> Result<bool> {
        if !is_word_level(tm, root) {
            return Ok(false);
        }
        let edge = self.blaster.blast_bool(&mut self.aig, tm, root)?;
        self.roots.push(root);
        self.root_edges.push(edge);
        Ok(true)
    }

    fn check_sat(&mut self, _tm: &mut TermManager, monitor: &TerminationMonitor) -> Result<SatResult> {
        self.props = 0;
        self.inputs.resize(self.aig.len(), false);
        let result = loop {
            let values = self.simulate();
            let unsat: Vec<AigEdge> = self
                .root_edges
                .iter()
                .copied()
                .filter(|&e| !edge_value(&values, e))
                .collect();
            if unsat.is_empty() {
                break SatResult::Sat;
            }
            if unsat.contains(&AigEdge::FALSE)
                || (self.nprops > 0 && self.props >= self.nprops)
                || monitor.should_terminate()
            {
                break SatResult::Unknown;
            }
            let root = unsat[self.rng.random_range(0..unsat.len())];
            self.propagate(&values, root);
        };
        debug!(result = %result, props = self.props, "bit-level local search finished");
        self.last = Some(result);
        Ok(result)
    }

    fn assignment(&mut self, tm: &mut TermManager) -> Result<Model> {
        if self.last != Some(SatResult::Sat) {
            return Err(OxbitError::state("the last check was not satisfiable"));
        }
        let values = self.simulate();
        let mut model = Model::new();
        for (t, bits) in self.blaster.inputs() {
            let raw: Vec<bool> = bits.iter().map(|&e| edge_value(&values, e)).collect();
            let v = decode(tm.sort_kind(*t), &raw)
                .ok_or_else(|| OxbitError::state(format!("cannot decode the value of {t}")))?;
            model.insert(*t, ModelValue::Scalar(v));
        }
        for c in tm.collect_consts(&self.roots) {
            if !model.contains(c) {
                model.insert(c, default_model_value(tm, tm.sort_of(c))?);
            }
        }
        Ok(model)
    }

    fn failed_roots(&self) -> Vec<usize> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evaluator;
    use oxbit_core::ast::TermKind;

    #[test]
    fn test_finds_model() {
        let mut tm = TermManager::new();
        let s = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(s, Some("x"));
        let y = tm.mk_const(s, Some("y"));
        let k = tm.mk_bv_value_u64(s, 0xa5).unwrap();
        let xor = tm.mk_term(TermKind::BvXor, &[x, y], &[]).unwrap();
        let eq = tm.mk_eq(xor, k).unwrap();
        let mut engine = AigPropEngine::new(&Options::default());
        assert!(engine.try_assert(&mut tm, eq).unwrap());
        let r = engine.check_sat(&mut tm, &TerminationMonitor::new()).unwrap();
        assert_eq!(r, SatResult::Sat);
        let model = engine.assignment(&mut tm).unwrap();
        assert_eq!(Evaluator::new().eval(&tm, &model, eq).unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_constant_false_root() {
        let mut tm = TermManager::new();
        let f = tm.mk_false();
        let mut engine = AigPropEngine::new(&Options::default());
        assert!(engine.try_assert(&mut tm, f).unwrap());
        let r = engine.check_sat(&mut tm, &TerminationMonitor::new()).unwrap();
        assert_eq!(r, SatResult::Unknown);
    }
}
