//! Interview engine — session registry, per-turn dialogue control, and the
//! interview definition store.

pub mod control;
pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod session;
pub mod store;
