//! And-inverter graphs
//!
//! Nodes are stored in creation order, which is a topological order: the
//! children of an AND node always have smaller indices. AND nodes are
//! structurally hashed and trivially simplified on construction.

use rustc_hash::FxHashMap;
use std::ops::Not;

/// Index of an AIG node
pub type NodeId = u32;

/// A possibly complemented reference to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AigEdge(u32);

impl AigEdge {
    /// Constant false
    pub const FALSE: AigEdge = AigEdge(0);
    /// Constant true
    pub const TRUE: AigEdge = AigEdge(1);

    fn new(node: NodeId, complemented: bool) -> Self {
        Self((node << 1) | u32::from(complemented))
    }

    /// Referenced node
    #[must_use]
    pub fn node(self) -> NodeId {
        self.0 >> 1
    }

    /// Is the reference complemented
    #[must_use]
    pub fn is_complemented(self) -> bool {
        self.0 & 1 == 1
    }

    /// Is this one of the two constants
    #[must_use]
    pub fn is_const(self) -> bool {
        self.node() == 0
    }

    /// Constant edge for `b`
    #[must_use]
    pub fn constant(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }
}

impl Not for AigEdge {
    type Output = AigEdge;

    fn not(self) -> AigEdge {
        AigEdge(self.0 ^ 1)
    }
}

/// A node of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AigNode {
    /// The constant-false node (index 0)
    False,
    /// A primary input
    Input,
    /// Conjunction of two edges
    And(AigEdge, AigEdge),
}

/// Structurally hashed and-inverter graph
#[derive(Debug, Clone)]
pub struct Aig {
    nodes: Vec<AigNode>,
    strash: FxHashMap<(AigEdge, AigEdge), NodeId>,
    num_inputs: usize,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    /// Graph holding only the constant node
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![AigNode::False],
            strash: FxHashMap::default(),
            num_inputs: 0,
        }
    }

    /// Number of nodes including the constant
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Only the constant node exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of primary inputs
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Number of AND nodes
    #[must_use]
    pub fn num_ands(&self) -> usize {
        self.nodes.len() - 1 - self.num_inputs
    }

    /// Node at `id`
    #[must_use]
    pub fn node(&self, id: NodeId) -> AigNode {
        self.nodes.get(id as usize).copied().unwrap_or(AigNode::False)
    }

    /// Fresh primary input
    pub fn input(&mut self) -> AigEdge {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(AigNode::Input);
        self.num_inputs += 1;
        AigEdge::new(id, false)
    }

    /// Vector of fresh inputs
    pub fn inputs(&mut self, n: u32) -> Vec<AigEdge> {
        (0..n).map(|_| self.input()).collect()
    }

    /// Conjunction
    pub fn and(&mut self, a: AigEdge, b: AigEdge) -> AigEdge {
        if a == AigEdge::FALSE || b == AigEdge::FALSE || a == !b {
            return AigEdge::FALSE;
        }
        if a == AigEdge::TRUE || a == b {
            return b;
        }
        if b == AigEdge::TRUE {
            return a;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&id) = self.strash.get(&key) {
            return AigEdge::new(id, false);
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(AigNode::And(key.0, key.1));
        self.strash.insert(key, id);
        AigEdge::new(id, false)
    }

    /// Disjunction
    pub fn or(&mut self, a: AigEdge, b: AigEdge) -> AigEdge {
        !self.and(!a, !b)
    }

    /// Exclusive or
    pub fn xor(&mut self, a: AigEdge, b: AigEdge) -> AigEdge {
        let l = self.and(a, !b);
        let r = self.and(!a, b);
        self.or(l, r)
    }

    /// Equivalence
    pub fn xnor(&mut self, a: AigEdge, b: AigEdge) -> AigEdge {
        !self.xor(a, b)
    }

    /// Implication
    pub fn implies(&mut self, a: AigEdge, b: AigEdge) -> AigEdge {
        self.or(!a, b)
    }

    /// Multiplexer `c ? t : e`
    pub fn ite(&mut self, c: AigEdge, t: AigEdge, e: AigEdge) -> AigEdge {
        if t == e {
            return t;
        }
        if c == AigEdge::TRUE {
            return t;
        }
        if c == AigEdge::FALSE {
            return e;
        }
        let l = self.and(c, t);
        let r = self.and(!c, e);
        self.or(l, r)
    }

    /// Conjunction of many edges
    pub fn and_all(&mut self, edges: impl IntoIterator<Item = AigEdge>) -> AigEdge {
        let mut acc = AigEdge::TRUE;
        for e in edges {
            acc = self.and(acc, e);
            if acc == AigEdge::FALSE {
                break;
            }
        }
        acc
    }

    /// Disjunction of many edges
    pub fn or_all(&mut self, edges: impl IntoIterator<Item = AigEdge>) -> AigEdge {
        let mut acc = AigEdge::FALSE;
        for e in edges {
            acc = self.or(acc, e);
            if acc == AigEdge::TRUE {
                break;
            }
        }
        acc
    }

    /// Simulate the whole graph; `input` gives the value of each input node
    pub fn simulate(&self, mut input: impl FnMut(NodeId) -> bool) -> Vec<bool> {
        let mut values = vec![false; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            values[i] = match *node {
                AigNode::False => false,
                AigNode::Input => input(i as NodeId),
                AigNode::And(a, b) => edge_value(&values, a) && edge_value(&values, b),
            };
        }
        values
    }
}

/// Value of an edge under node values produced by [`Aig::simulate`]
#[must_use]
pub fn edge_value(values: &[bool], e: AigEdge) -> bool {
    values.get(e.node() as usize).copied().unwrap_or(false) ^ e.is_complemented()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_hashing() {
        let mut aig = Aig::new();
        let a = aig.input();
        let b = aig.input();
        let x = aig.and(a, b);
        let y = aig.and(b, a);
        assert_eq!(x, y);
        assert_eq!(aig.num_ands(), 1);
        assert_eq!(aig.and(a, !a), AigEdge::FALSE);
        assert_eq!(aig.and(a, AigEdge::TRUE), a);
        assert_eq!(aig.or(a, !a), AigEdge::TRUE);
    }

    #[test]
    fn test_simulation() {
        let mut aig = Aig::new();
        let a = aig.input();
        let b = aig.input();
        let c = aig.input();
        let x = aig.xor(a, b);
        let m = aig.ite(c, x, a);
        for bits in 0u32..8 {
            let v = |n: NodeId| bits >> (n - 1) & 1 == 1;
            let values = aig.simulate(v);
            let (va, vb, vc) = (v(1), v(2), v(3));
            assert_eq!(edge_value(&values, x), va ^ vb);
            assert_eq!(edge_value(&values, m), if vc { va ^ vb } else { va });
        }
    }
}
