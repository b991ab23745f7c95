use rand::{SeedableRng, rngs::StdRng};
use tracing::debug;

use super::types::{
    ChannelContext, OutputChannel, RampTiming, bounded_walk, ramp_progress, uniform,
};

/// Duty-cycle parameters of the DC load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcProfile {
    /// Power band while the compressor runs (kW).
    pub on_min_kw: f64,
    pub on_max_kw: f64,
    /// Per-tick jitter while running (kW).
    pub on_walk_delta_kw: f64,
    /// Standby power band between compressor runs (kW).
    pub off_min_kw: f64,
    pub off_max_kw: f64,
    /// Per-tick jitter in standby (kW).
    pub off_walk_delta_kw: f64,
    /// Range of each compressor run (seconds).
    pub on_secs_min: f64,
    pub on_secs_max: f64,
    /// Range of each standby interval (seconds).
    pub off_secs_min: f64,
    pub off_secs_max: f64,
    /// Single-tick peak emitted at every compressor transition (kW).
    pub inrush_kw: f64,
}

impl Default for DcProfile {
    fn default() -> Self {
        Self {
            on_min_kw: 3.5,
            on_max_kw: 4.5,
            on_walk_delta_kw: 0.2,
            off_min_kw: 0.3,
            off_max_kw: 0.8,
            off_walk_delta_kw: 0.05,
            on_secs_min: 30.0,
            on_secs_max: 60.0,
            off_secs_min: 20.0,
            off_secs_max: 40.0,
            inrush_kw: 5.0,
        }
    }
}

/// Phase of the DC channel. Timers count down in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DcPhase {
    Off,
    RampUp { elapsed_secs: f64, on_secs: f64 },
    CompressorOn { remaining_secs: f64 },
    SpikeToOff { off_secs: f64 },
    CompressorOff { remaining_secs: f64 },
    SpikeToOn { on_secs: f64 },
    RampDown { elapsed_secs: f64, start_power_kw: f64 },
}

impl DcPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::RampUp { .. } => "ramp_up",
            Self::CompressorOn { .. } => "compressor_on",
            Self::SpikeToOff { .. } => "spike_to_off",
            Self::CompressorOff { .. } => "compressor_off",
            Self::SpikeToOn { .. } => "spike_to_on",
            Self::RampDown { .. } => "ramp_down",
        }
    }
}

/// A compressor-style DC load (fridge, cooler box).
///
/// After a linear ramp-up the load alternates between a running band and a
/// standby band. Each transition between the two emits exactly one tick at
/// `inrush_kw`.
#[derive(Debug, Clone)]
pub struct DcChannel {
    profile: DcProfile,
    timing: RampTiming,
    phase: DcPhase,
    rng: StdRng,
}

impl DcChannel {
    /// Creates a DC channel in the `Off` phase.
    ///
    /// # Arguments
    ///
    /// * `profile` - Duty-cycle parameters
    /// * `timing` - Ramp durations
    /// * `seed` - Random seed for power jitter and cycle lengths
    pub fn new(profile: DcProfile, timing: RampTiming, seed: u64) -> Self {
        Self {
            profile,
            timing,
            phase: DcPhase::Off,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn phase(&self) -> DcPhase {
        self.phase
    }

    pub fn profile(&self) -> &DcProfile {
        &self.profile
    }

    fn sample_on_secs(&mut self) -> f64 {
        uniform(&mut self.rng, self.profile.on_secs_min, self.profile.on_secs_max)
    }

    fn sample_off_secs(&mut self) -> f64 {
        uniform(&mut self.rng, self.profile.off_secs_min, self.profile.off_secs_max)
    }

    fn sample_on_kw(&mut self) -> f64 {
        uniform(&mut self.rng, self.profile.on_min_kw, self.profile.on_max_kw)
    }

    fn sample_off_kw(&mut self) -> f64 {
        uniform(&mut self.rng, self.profile.off_min_kw, self.profile.off_max_kw)
    }

    fn walk(&mut self, prev: f64, delta: f64, min: f64, max: f64) -> f64 {
        let start = if prev > 0.0 { prev } else { (min + max) / 2.0 };
        bounded_walk(&mut self.rng, start, delta, min, max)
    }
}

impl OutputChannel for DcChannel {
    fn power_kw(&mut self, context: &ChannelContext) -> f64 {
        if !context.is_on && !self.is_ramping_down() {
            self.phase = DcPhase::Off;
            return 0.0;
        }

        let p = self.profile;
        match self.phase {
            DcPhase::Off => 0.0,
            DcPhase::RampUp {
                elapsed_secs,
                on_secs,
            } => {
                let elapsed_secs = elapsed_secs + context.tick_sec;
                let progress = ramp_progress(elapsed_secs, self.timing.up_secs);
                let power = self.sample_on_kw() * progress;
                self.phase = if progress >= 1.0 {
                    debug!(on_secs, "dc compressor on");
                    DcPhase::CompressorOn {
                        remaining_secs: on_secs,
                    }
                } else {
                    DcPhase::RampUp {
                        elapsed_secs,
                        on_secs,
                    }
                };
                power
            }
            DcPhase::CompressorOn { remaining_secs } => {
                let remaining_secs = remaining_secs - context.tick_sec;
                if remaining_secs <= 0.0 {
                    let off_secs = self.sample_off_secs();
                    debug!(off_secs, "dc inrush, compressor stopping");
                    self.phase = DcPhase::SpikeToOff { off_secs };
                    return p.inrush_kw;
                }
                self.phase = DcPhase::CompressorOn { remaining_secs };
                self.walk(
                    context.prev_power_kw,
                    p.on_walk_delta_kw,
                    p.on_min_kw,
                    p.on_max_kw,
                )
            }
            DcPhase::SpikeToOff { off_secs } => {
                self.phase = DcPhase::CompressorOff {
                    remaining_secs: off_secs,
                };
                self.sample_off_kw()
            }
            DcPhase::CompressorOff { remaining_secs } => {
                let remaining_secs = remaining_secs - context.tick_sec;
                if remaining_secs <= 0.0 {
                    let on_secs = self.sample_on_secs();
                    debug!(on_secs, "dc inrush, compressor starting");
                    self.phase = DcPhase::SpikeToOn { on_secs };
                    return p.inrush_kw;
                }
                self.phase = DcPhase::CompressorOff { remaining_secs };
                self.walk(
                    context.prev_power_kw,
                    p.off_walk_delta_kw,
                    p.off_min_kw,
                    p.off_max_kw,
                )
            }
            DcPhase::SpikeToOn { on_secs } => {
                self.phase = DcPhase::CompressorOn {
                    remaining_secs: on_secs,
                };
                self.sample_on_kw()
            }
            DcPhase::RampDown {
                elapsed_secs,
                start_power_kw,
            } => {
                let elapsed_secs = elapsed_secs + context.tick_sec;
                let progress = ramp_progress(elapsed_secs, self.timing.down_secs);
                if progress >= 1.0 {
                    debug!("dc ramp-down complete");
                    self.phase = DcPhase::Off;
                    return 0.0;
                }
                self.phase = DcPhase::RampDown {
                    elapsed_secs,
                    start_power_kw,
                };
                start_power_kw * (1.0 - progress)
            }
        }
    }

    fn switch_on(&mut self) {
        let on_secs = self.sample_on_secs();
        self.phase = DcPhase::RampUp {
            elapsed_secs: 0.0,
            on_secs,
        };
    }

    fn switch_off(&mut self, current_power_kw: f64) {
        self.phase = DcPhase::RampDown {
            elapsed_secs: 0.0,
            start_power_kw: current_power_kw,
        };
    }

    fn is_ramping_down(&self) -> bool {
        matches!(self.phase, DcPhase::RampDown { .. })
    }

    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }
}
