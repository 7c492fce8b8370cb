//! Lazy Tseitin encoding of AIG cones into a SAT backend
//!
//! A node gets a SAT variable the first time an edge into its cone is
//! requested. Each AND node contributes the three clauses of `v <-> a & b`;
//! the constant node is a variable forced false by a unit clause.

use super::aig::{Aig, AigEdge, AigNode};
use oxbit_sat::{LBool, Lit, SatBackend, Var};

/// Node-to-variable map of one AIG and one backend
#[derive(Debug, Default)]
pub struct CnfEncoder {
    vars: Vec<Option<Var>>,
    clauses: u64,
}

impl CnfEncoder {
    /// Encoder with no encoded nodes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clauses emitted so far
    #[must_use]
    pub fn num_clauses(&self) -> u64 {
        self.clauses
    }

    /// Variable of an already encoded node
    #[must_use]
    pub fn var_of(&self, node: u32) -> Option<Var> {
        self.vars.get(node as usize).copied().flatten()
    }

    /// SAT literal equivalent to `edge`, encoding its cone on demand
    pub fn lit(&mut self, aig: &Aig, sat: &mut dyn SatBackend, edge: AigEdge) -> Lit {
        if self.vars.len() < aig.len() {
            self.vars.resize(aig.len(), None);
        }
        let mut stack = vec![(edge.node(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if self.vars[node as usize].is_some() {
                continue;
            }
            match aig.node(node) {
                AigNode::False => {
                    let v = sat.new_var();
                    sat.add_clause(&[Lit::neg(v)]);
                    self.clauses += 1;
                    self.vars[node as usize] = Some(v);
                }
                AigNode::Input => {
                    self.vars[node as usize] = Some(sat.new_var());
                }
                AigNode::And(a, b) => {
                    if expanded {
                        let v = sat.new_var();
                        let la = self.edge_lit(a);
                        let lb = self.edge_lit(b);
                        sat.add_clause(&[Lit::neg(v), la]);
                        sat.add_clause(&[Lit::neg(v), lb]);
                        sat.add_clause(&[Lit::pos(v), !la, !lb]);
                        self.clauses += 3;
                        self.vars[node as usize] = Some(v);
                    } else {
                        stack.push((node, true));
                        stack.push((a.node(), false));
                        stack.push((b.node(), false));
                    }
                }
            }
        }
        self.edge_lit(edge)
    }

    fn edge_lit(&self, edge: AigEdge) -> Lit {
        // every caller encodes the node first
        let var = self.vars[edge.node() as usize].unwrap_or(Var::new(0));
        Lit::new(var, !edge.is_complemented())
    }

    /// Assert `edge` permanently
    pub fn assert_edge(&mut self, aig: &Aig, sat: &mut dyn SatBackend, edge: AigEdge) -> bool {
        let l = self.lit(aig, sat, edge);
        self.clauses += 1;
        sat.add_clause(&[l])
    }

    /// Value of an input node in the last model; unencoded inputs are false
    #[must_use]
    pub fn input_value(&self, sat: &dyn SatBackend, node: u32) -> bool {
        match self.var_of(node) {
            Some(v) => sat.value(Lit::pos(v)) == LBool::True,
            None => false,
        }
    }
}
