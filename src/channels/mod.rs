//! Output-channel models for the AC and DC export terminals.

/// Inverter-backed AC outlet with ease-out ramp and steady jitter.
pub mod ac;
/// Compressor-style DC load with an on/off duty cycle and inrush spikes.
pub mod dc;
pub mod types;

pub use ac::{AcChannel, AcPhase, AcProfile};
pub use dc::{DcChannel, DcPhase, DcProfile};
pub use types::{ChannelContext, OutputChannel, RampTiming};
