//! Core domain logic for innkeeper: the phrase-table responder and the
//! application configuration layer. No I/O beyond config file reads.

pub mod config;
pub mod responder;

pub use responder::{classify, normalize, PhraseTable, FALLBACK_REPLY};
