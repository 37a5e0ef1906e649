//! The AI-assisted interview: candidate roster, six timed questions per
//! candidate, grading, and the interviewer dashboard.

pub mod dashboard;
pub mod handlers;
pub mod manager;
pub mod models;
pub mod persistence;
pub mod prompts;
pub mod questions;
pub mod resume;
pub mod scoring;
pub mod session;
pub mod validation;
