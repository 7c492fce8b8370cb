//! Assertion stack with push/pop frames and pending assumptions
//!
//! Every stored term holds one ownership reference in the term manager,
//! taken on entry and dropped when the term leaves the stack.

use oxbit_core::ast::{TermId, TermManager};
use oxbit_core::{OxbitError, Result};

/// Scoped assertions plus the assumptions of the next check
#[derive(Debug, Default)]
pub struct AssertionStack {
    entries: Vec<TermId>,
    /// Start index into `entries` of every open frame
    frames: Vec<usize>,
    assumptions: Vec<TermId>,
}

impl AssertionStack {
    /// Empty stack at level 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open frames
    #[must_use]
    pub fn level(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Add an assertion to the innermost frame
    pub fn assert(&mut self, tm: &mut TermManager, term: TermId) {
        tm.retain(term);
        self.entries.push(term);
    }

    /// Open `n` frames
    pub fn push(&mut self, n: u32) {
        for _ in 0..n {
            self.frames.push(self.entries.len());
        }
    }

    /// Close `n` frames, dropping their assertions
    ///
    /// # Errors
    ///
    /// Returns a state error when fewer than `n` frames are open.
    pub fn pop(&mut self, tm: &mut TermManager, n: u32) -> Result<()> {
        if n > self.level() {
            return Err(OxbitError::state(format!(
                "cannot pop {n} levels, only {} open",
                self.level()
            )));
        }
        for _ in 0..n {
            let Some(start) = self.frames.pop() else { break };
            for t in self.entries.drain(start..) {
                tm.release(t);
            }
        }
        Ok(())
    }

    /// Register an assumption for the next check
    pub fn assume(&mut self, tm: &mut TermManager, term: TermId) {
        tm.retain(term);
        self.assumptions.push(term);
    }

    /// Pending assumptions in registration order
    #[must_use]
    pub fn assumptions(&self) -> &[TermId] {
        &self.assumptions
    }

    /// Turn pending assumptions into assertions of the innermost frame
    pub fn fixate_assumptions(&mut self) {
        // ownership moves with the term
        self.entries.append(&mut self.assumptions);
    }

    /// Drop all pending assumptions
    pub fn clear_assumptions(&mut self, tm: &mut TermManager) {
        for t in self.assumptions.drain(..) {
            tm.release(t);
        }
    }

    /// Current assertions, outermost frame first
    pub fn assertions(&self) -> impl Iterator<Item = TermId> + '_ {
        self.entries.iter().copied()
    }

    /// Number of current assertions
    #[must_use]
    pub fn num_assertions(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_restores() {
        let mut tm = TermManager::new();
        let b = tm.mk_bool_sort();
        let p = tm.mk_const(b, Some("p"));
        let q = tm.mk_const(b, Some("q"));
        let mut st = AssertionStack::new();
        st.assert(&mut tm, p);
        st.push(2);
        st.assert(&mut tm, q);
        assert_eq!(st.level(), 2);
        assert_eq!(st.num_assertions(), 2);
        assert_eq!(tm.ref_count(q), 2);
        st.pop(&mut tm, 2).unwrap();
        assert_eq!(st.assertions().collect::<Vec<_>>(), vec![p]);
        assert_eq!(tm.ref_count(q), 1);
        assert!(st.pop(&mut tm, 1).unwrap_err().is_state_error());
    }

    #[test]
    fn test_fixated_assumptions_follow_frame() {
        let mut tm = TermManager::new();
        let b = tm.mk_bool_sort();
        let p = tm.mk_const(b, Some("p"));
        let mut st = AssertionStack::new();
        st.push(1);
        st.assume(&mut tm, p);
        st.fixate_assumptions();
        assert!(st.assumptions().is_empty());
        assert_eq!(st.num_assertions(), 1);
        st.pop(&mut tm, 1).unwrap();
        assert_eq!(st.num_assertions(), 0);
        assert_eq!(tm.ref_count(p), 1);
    }
}
