//! EV battery-to-home (B2H) power export simulator and charging journey planner.

#[cfg(feature = "api")]
pub mod api;
/// Power output channel models for the AC and DC terminals.
pub mod channels;
pub mod config;
pub mod format;
pub mod io;
/// Five-stage journey recomputation pipeline and stateful planner.
pub mod journey;
pub mod session;
/// Power simulator, clock, history, and usage limits.
pub mod sim;
pub mod sync;
