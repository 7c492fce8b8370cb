//! Check results

use std::fmt;

/// Outcome of a satisfiability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatResult {
    /// The assertions and assumptions have a model
    Sat,
    /// The assertions and assumptions are contradictory
    Unsat,
    /// The check was interrupted or gave up
    Unknown,
}

impl SatResult {
    /// Is this `sat`
    #[must_use]
    pub fn is_sat(self) -> bool {
        self == SatResult::Sat
    }

    /// Is this `unsat`
    #[must_use]
    pub fn is_unsat(self) -> bool {
        self == SatResult::Unsat
    }

    /// Is this `unknown`
    #[must_use]
    pub fn is_unknown(self) -> bool {
        self == SatResult::Unknown
    }
}

impl From<oxbit_sat::SolverResult> for SatResult {
    fn from(r: oxbit_sat::SolverResult) -> Self {
        match r {
            oxbit_sat::SolverResult::Sat => SatResult::Sat,
            oxbit_sat::SolverResult::Unsat => SatResult::Unsat,
            oxbit_sat::SolverResult::Unknown => SatResult::Unknown,
        }
    }
}

impl fmt::Display for SatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SatResult::Sat => "sat",
            SatResult::Unsat => "unsat",
            SatResult::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SatResult::Sat.to_string(), "sat");
        assert_eq!(SatResult::Unsat.to_string(), "unsat");
        assert_eq!(SatResult::Unknown.to_string(), "unknown");
        assert!(SatResult::from(oxbit_sat::SolverResult::Unsat).is_unsat());
    }
}
