use rand::{SeedableRng, rngs::StdRng};
use tracing::debug;

use super::types::{
    ChannelContext, OutputChannel, RampTiming, bounded_walk, ease_out_cubic, ramp_progress,
};

/// Steady-state power envelope of the AC outlet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcProfile {
    /// Ramp-up target and fallback for the random walk (kW).
    pub base_kw: f64,
    /// Lower bound while running (kW).
    pub min_kw: f64,
    /// Upper bound while running (kW).
    pub max_kw: f64,
    /// Maximum per-tick jitter (kW).
    pub walk_delta_kw: f64,
}

impl Default for AcProfile {
    fn default() -> Self {
        Self {
            base_kw: 2.4,
            min_kw: 2.0,
            max_kw: 2.8,
            walk_delta_kw: 0.15,
        }
    }
}

/// Phase of the AC channel.
///
/// `Off -> RampUp -> Running -> RampDown -> Off`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcPhase {
    Off,
    RampUp { elapsed_secs: f64 },
    Running,
    RampDown { elapsed_secs: f64, start_power_kw: f64 },
}

impl AcPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::RampUp { .. } => "ramp_up",
            Self::Running => "running",
            Self::RampDown { .. } => "ramp_down",
        }
    }
}

/// An inverter-fed AC outlet.
///
/// Ramps up along an ease-out cubic to `base_kw`, then jitters inside
/// `[min_kw, max_kw]`. On switch-off the output decays linearly from
/// whatever it was delivering.
#[derive(Debug, Clone)]
pub struct AcChannel {
    profile: AcProfile,
    timing: RampTiming,
    phase: AcPhase,
    rng: StdRng,
}

impl AcChannel {
    /// Creates an AC channel in the `Off` phase.
    ///
    /// # Arguments
    ///
    /// * `profile` - Steady-state power envelope
    /// * `timing` - Ramp durations
    /// * `seed` - Random seed for the steady-state jitter
    pub fn new(profile: AcProfile, timing: RampTiming, seed: u64) -> Self {
        Self {
            profile,
            timing,
            phase: AcPhase::Off,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn phase(&self) -> AcPhase {
        self.phase
    }

    pub fn profile(&self) -> &AcProfile {
        &self.profile
    }
}

impl OutputChannel for AcChannel {
    fn power_kw(&mut self, context: &ChannelContext) -> f64 {
        if !context.is_on && !self.is_ramping_down() {
            self.phase = AcPhase::Off;
            return 0.0;
        }

        match self.phase {
            AcPhase::Off => 0.0,
            AcPhase::RampUp { elapsed_secs } => {
                let elapsed_secs = elapsed_secs + context.tick_sec;
                let progress = ramp_progress(elapsed_secs, self.timing.up_secs);
                let power = self.profile.base_kw * ease_out_cubic(progress);
                if progress >= 1.0 {
                    debug!(power, "ac ramp-up complete");
                    self.phase = AcPhase::Running;
                } else {
                    self.phase = AcPhase::RampUp { elapsed_secs };
                }
                power
            }
            AcPhase::Running => {
                let prev = if context.prev_power_kw > 0.0 {
                    context.prev_power_kw
                } else {
                    self.profile.base_kw
                };
                bounded_walk(
                    &mut self.rng,
                    prev,
                    self.profile.walk_delta_kw,
                    self.profile.min_kw,
                    self.profile.max_kw,
                )
            }
            AcPhase::RampDown {
                elapsed_secs,
                start_power_kw,
            } => {
                let elapsed_secs = elapsed_secs + context.tick_sec;
                let progress = ramp_progress(elapsed_secs, self.timing.down_secs);
                if progress >= 1.0 {
                    debug!("ac ramp-down complete");
                    self.phase = AcPhase::Off;
                    return 0.0;
                }
                self.phase = AcPhase::RampDown {
                    elapsed_secs,
                    start_power_kw,
                };
                start_power_kw * (1.0 - progress)
            }
        }
    }

    fn switch_on(&mut self) {
        self.phase = AcPhase::RampUp { elapsed_secs: 0.0 };
    }

    fn switch_off(&mut self, current_power_kw: f64) {
        self.phase = AcPhase::RampDown {
            elapsed_secs: 0.0,
            start_power_kw: current_power_kw,
        };
    }

    fn is_ramping_down(&self) -> bool {
        matches!(self.phase, AcPhase::RampDown { .. })
    }

    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(up: f64, down: f64) -> AcChannel {
        AcChannel::new(
            AcProfile::default(),
            RampTiming {
                up_secs: up,
                down_secs: down,
            },
            42,
        )
    }

    #[test]
    fn off_channel_draws_nothing() {
        let mut ac = channel(2.0, 2.0);
        let ctx = ChannelContext::new(false, 0.0, 2.0);
        assert_eq!(ac.power_kw(&ctx), 0.0);
        assert_eq!(ac.phase(), AcPhase::Off);
    }

    #[test]
    fn single_tick_ramp_reaches_base() {
        let mut ac = channel(2.0, 2.0);
        ac.switch_on();
        let p = ac.power_kw(&ChannelContext::new(true, 0.0, 2.0));
        assert!((p - 2.4).abs() < 1e-9);
        assert_eq!(ac.phase(), AcPhase::Running);
    }

    #[test]
    fn longer_ramp_follows_ease_out() {
        let mut ac = channel(4.0, 2.0);
        ac.switch_on();
        let p = ac.power_kw(&ChannelContext::new(true, 0.0, 2.0));
        // progress 0.5 -> ease 0.875
        assert!((p - 2.4 * 0.875).abs() < 1e-9);
        assert_eq!(ac.phase_name(), "ramp_up");
        let p2 = ac.power_kw(&ChannelContext::new(true, p, 2.0));
        assert!((p2 - 2.4).abs() < 1e-9);
        assert_eq!(ac.phase(), AcPhase::Running);
    }

    #[test]
    fn running_power_stays_in_band() {
        let mut ac = channel(2.0, 2.0);
        ac.switch_on();
        let mut p = ac.power_kw(&ChannelContext::new(true, 0.0, 2.0));
        for _ in 0..500 {
            p = ac.power_kw(&ChannelContext::new(true, p, 2.0));
            assert!((2.0..=2.8).contains(&p), "out of band: {p}");
        }
    }

    #[test]
    fn ramp_down_decays_from_live_power() {
        let mut ac = channel(2.0, 4.0);
        ac.switch_on();
        let p = ac.power_kw(&ChannelContext::new(true, 0.0, 2.0));
        ac.switch_off(p);
        assert!(ac.is_ramping_down());
        let half = ac.power_kw(&ChannelContext::new(false, p, 2.0));
        assert!((half - p * 0.5).abs() < 1e-9);
        let zero = ac.power_kw(&ChannelContext::new(false, half, 2.0));
        assert_eq!(zero, 0.0);
        assert_eq!(ac.phase(), AcPhase::Off);
    }
}
