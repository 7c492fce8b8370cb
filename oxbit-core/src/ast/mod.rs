//! Terms and the hash-consing term manager

pub mod kind;
pub mod manager;
pub mod substitute;
pub mod term;
pub mod traversal;

pub use kind::TermKind;
pub use manager::TermManager;
pub use substitute::SubstMap;
pub use term::{Term, TermArgs, TermId};
