//! Interface for textual format front ends
//!
//! No parser ships with OxBit. A front end for SMT-LIB2, BTOR or BTOR2
//! translates its input into calls on a [`FormulaSink`], which the solver
//! implements.

use crate::ast::{TermId, TermManager};
use crate::error::{OxbitError, Result};
use thiserror::Error;

/// Failure of a format parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    /// Human readable description, usually with a position
    pub message: String,
    /// Whether some commands were already executed before the failure
    pub partial: bool,
}

impl ParseError {
    /// Create a parse error
    pub fn new(message: impl Into<String>, partial: bool) -> Self {
        Self {
            message: message.into(),
            partial,
        }
    }
}

impl From<ParseError> for OxbitError {
    fn from(e: ParseError) -> Self {
        OxbitError::Parse(e.message)
    }
}

/// Receiver of the commands a parser recognizes
pub trait FormulaSink {
    /// Term manager used to build the parsed terms
    fn term_manager(&mut self) -> &mut TermManager;

    /// `(assert t)`
    fn assert_formula(&mut self, term: TermId) -> Result<()>;

    /// `(push n)`
    fn push(&mut self, levels: u32) -> Result<()>;

    /// `(pop n)`
    fn pop(&mut self, levels: u32) -> Result<()>;
}

/// A textual format front end
pub trait FormulaParser {
    /// Name of the input dialect
    fn dialect(&self) -> &'static str;

    /// Parse `input`, forwarding each recognized command to `sink`
    fn parse(&mut self, input: &str, sink: &mut dyn FormulaSink) -> std::result::Result<(), ParseError>;
}
