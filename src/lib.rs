//! Detect fillable form fields, turn a language model's answer into a
//! typed fill plan, and apply that plan reversibly.
//!
//! The pipeline runs against an in-memory page model loaded from a JSON
//! snapshot:
//!
//! 1. [`detect`] scans a document and stamps every fillable control with
//!    an identity key.
//! 2. [`plan`] validates (and at most once repairs) the model's output.
//! 3. [`fill`] applies the plan through native setters and records what
//!    it changed so [`fill::rollback`] can undo it.
//!
//! [`session`] wires the stages together.

pub mod cli;
pub mod detect;
pub mod dom;
pub mod fill;
pub mod model;
pub mod plan;
pub mod session;
pub mod trace;
