//! Editable aggregate models and their identity/status primitives.
//!
//! # Responsibility
//! - Define the canonical shapes edited by the profile, memo and question /
//!   exam authoring surfaces.
//! - Keep workflow gates next to the data they inspect.
//!
//! # Invariants
//! - Every aggregate is identified by exactly one `AggregateId`.
//! - Workflow status only moves forward.

pub mod aggregate;
pub mod exam;
pub mod identifier;
pub mod memo;
pub mod profile;
pub mod question;
pub mod session;
pub mod status;
