//! Authority-gated credential scoring.
//!
//! An organization publishes a weighted rubric, registers applicants, and stamps each
//! applicant's credential with the level their aggregate score resolves to.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
