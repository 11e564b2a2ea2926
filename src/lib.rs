//! Adaptive vocabulary quiz engine: difficulty-weighted question sampling,
//! a retry queue for missed terms, review rounds, and per-topic stats, all
//! driven by a single-threaded session state machine.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod session;
pub mod store;
