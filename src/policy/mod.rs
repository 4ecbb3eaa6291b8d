//! Content-safety policy: input screening and output rewriting.
//!
//! Two pure operations over an immutable, injected rule set:
//! `check_input` gates what reaches the rest of the engine, `check_output`
//! converts assertive diagnostic phrasing into advisory phrasing and
//! guarantees the disclaimer. Rule evaluation never fails — a malformed or
//! empty rule table degrades to a pass, not an error.

pub mod engine;
pub mod rules;
pub mod sanitize;
pub mod types;

pub use engine::PolicyEngine;
pub use rules::{RuleSet, RuleSetBuilder};
pub use types::{PolicyAction, PolicyVerdict, RuleCategory};
