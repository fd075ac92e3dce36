//! Spatiotemporal consistency engine for expense fraud review.
//!
//! Takes a batch of trajectory events, runs every registered detection rule
//! over it under a uniform contract, and returns explainable alerts plus a
//! diagnostics side-channel. Rules plug in through the [`rule::Rule`] trait;
//! the engine owns filtering, grouping, failure isolation, and alert-level
//! deduplication.

pub mod alert;
pub mod engine;
pub mod geo;
pub mod grouping;
pub mod rule;
pub mod temporal;

pub use alert::{Alert, BatchOutcome, Diagnostic, DiagnosticKind};
pub use engine::{evaluate_batch, EngineOptions};
pub use grouping::{EventGroup, GroupingStrategy, WindowMode};
pub use rule::{AlertText, Detection, Finding, Rule, RuleDescriptor, Severity};
pub use temporal::TimeUnit;
