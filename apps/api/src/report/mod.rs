//! Report Synthesizer — one cached evaluation report per interview.

pub mod handlers;
pub mod prompts;
pub mod synthesizer;
