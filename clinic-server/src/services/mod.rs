//! Business services
//!
//! Each operation takes the shared state and the caller's tenant identity,
//! validates input, talks to the repositories and writes the audit trail.

pub mod appointment;
pub mod billing;
pub mod patient;
pub mod queue;
