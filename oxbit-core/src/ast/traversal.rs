//! DAG traversals

use super::kind::TermKind;
use super::manager::TermManager;
use super::term::TermId;
use rustc_hash::FxHashSet;

impl TermManager {
    /// All nodes reachable from `roots`, children before parents, each once
    #[must_use]
    pub fn post_order(&self, roots: &[TermId]) -> Vec<TermId> {
        let mut order = Vec::new();
        let mut visited: FxHashSet<TermId> = FxHashSet::default();
        let mut stack: Vec<(TermId, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for &a in self[id].args.iter().rev() {
                if !visited.contains(&a) {
                    stack.push((a, false));
                }
            }
        }
        order
    }

    /// Uninterpreted constants reachable from `roots`, in post order
    #[must_use]
    pub fn collect_consts(&self, roots: &[TermId]) -> Vec<TermId> {
        self.post_order(roots)
            .into_iter()
            .filter(|&t| self[t].kind == TermKind::Const)
            .collect()
    }

    /// Reachable nodes of the given kind
    #[must_use]
    pub fn collect_kind(&self, roots: &[TermId], kind: TermKind) -> Vec<TermId> {
        self.post_order(roots)
            .into_iter()
            .filter(|&t| self[t].kind == kind)
            .collect()
    }

    /// Does `needle` occur in `haystack`
    #[must_use]
    pub fn occurs(&self, needle: TermId, haystack: TermId) -> bool {
        let mut visited: FxHashSet<TermId> = FxHashSet::default();
        let mut stack = vec![haystack];
        while let Some(id) = stack.pop() {
            if id == needle {
                return true;
            }
            if visited.insert(id) {
                stack.extend(self[id].args.iter().copied());
            }
        }
        false
    }

    /// Whether any node of one of `kinds` is reachable from `roots`
    #[must_use]
    pub fn contains_kind(&self, roots: &[TermId], kinds: &[TermKind]) -> bool {
        self.post_order(roots).into_iter().any(|t| kinds.contains(&self[t].kind))
    }

    /// Number of distinct nodes reachable from `roots`
    #[must_use]
    pub fn dag_size(&self, roots: &[TermId]) -> usize {
        self.post_order(roots).len()
    }
}
