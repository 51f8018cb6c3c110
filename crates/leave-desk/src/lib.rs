//! Leave request lifecycle, approval rules, and invitation-based onboarding.
//!
//! The crate is a library of domain operations. Storage, notification delivery, password
//! hashing, and the clock are reached through traits so a boundary layer can wire in its own
//! collaborators; [`memory::InMemoryStore`] and [`workflows::notifications::Outbox`] cover
//! demos and tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod memory;
pub mod telemetry;
pub mod workflows;
