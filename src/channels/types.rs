//! Common types and traits for output-channel simulation.

use rand::{Rng, rngs::StdRng};

/// Contextual information passed to a channel on every tick.
///
/// # Fields
/// * `is_on` - Whether the terminal is switched on (a ramp-down may still be running when off)
/// * `prev_power_kw` - Power reported on the previous tick, already rounded
/// * `tick_sec` - Length of one simulation tick in seconds
pub struct ChannelContext {
    pub is_on: bool,
    pub prev_power_kw: f64,
    pub tick_sec: f64,
}

impl ChannelContext {
    pub fn new(is_on: bool, prev_power_kw: f64, tick_sec: f64) -> Self {
        Self {
            is_on,
            prev_power_kw,
            tick_sec,
        }
    }
}

/// Ramp durations, kept independent of the tick length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampTiming {
    /// Seconds from switch-on to steady state.
    pub up_secs: f64,
    /// Seconds from switch-off to zero output.
    pub down_secs: f64,
}

impl Default for RampTiming {
    fn default() -> Self {
        Self {
            up_secs: 2.0,
            down_secs: 2.0,
        }
    }
}

/// Trait defining an export channel driven by a fixed-period tick.
///
/// Implementors own their phase machine; the simulator owns the terminal
/// flags and only talks to channels through this interface.
pub trait OutputChannel {
    /// Advances the phase machine by one tick and returns the instantaneous power.
    ///
    /// # Arguments
    ///
    /// * `context` - Terminal flag, previous power and tick length
    ///
    /// # Returns
    ///
    /// Power drawn from the battery in kilowatts (kW, >= 0)
    fn power_kw(&mut self, context: &ChannelContext) -> f64;

    /// Seeds the ramp-up phase. Takes effect on the next tick.
    fn switch_on(&mut self);

    /// Seeds the ramp-down phase, decaying from `current_power_kw`.
    fn switch_off(&mut self, current_power_kw: f64);

    /// Whether the channel is still decaying after a switch-off.
    fn is_ramping_down(&self) -> bool;

    /// Short snake_case name of the current phase.
    fn phase_name(&self) -> &'static str;
}

/// Progress through a ramp, clamped to `[0, 1]`. A zero-length ramp is complete immediately.
pub fn ramp_progress(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 1.0;
    }
    (elapsed_secs / duration_secs).clamp(0.0, 1.0)
}

/// `1 - (1 - p)^3`
pub fn ease_out_cubic(progress: f64) -> f64 {
    1.0 - (1.0 - progress).powi(3)
}

/// Uniform sample from `[min, max]`. Collapses to `min` when the range is empty.
pub fn uniform(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    rng.random_range(min..=max)
}

/// One step of a bounded random walk: `clamp(prev + U(-delta, delta), min, max)`.
pub fn bounded_walk(rng: &mut StdRng, prev: f64, delta: f64, min: f64, max: f64) -> f64 {
    let step = uniform(rng, -delta.abs(), delta.abs());
    (prev + step).clamp(min, max)
}
