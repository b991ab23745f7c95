//! Tick-driven power simulator owning both terminals and the battery.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::clock::SimClock;
use super::history::PowerHistory;
use super::types::{
    BatterySnapshot, BatterySpec, Channel, PowerSample, SimConfig, Terminal, TerminalSpec,
    TickReport,
};
use super::usage::{UsageAlert, UsageLimit};
use crate::channels::{AcChannel, ChannelContext, DcChannel, OutputChannel};
use crate::format::{NO_VALUE, format_duration_hm, round_to};

/// Command processed by the simulator between or on ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCommand {
    Tick,
    Toggle(Channel),
    StopAll,
}

/// Power simulator for the AC and DC export terminals.
///
/// Single owner of all channel state. Toggle commands only flip the
/// terminal flag and seed the channel's ramp; the new phase is evaluated on
/// the next tick.
pub struct PowerSimulator {
    config: SimConfig,
    battery_spec: BatterySpec,
    ac: AcChannel,
    dc: DcChannel,
    ac_terminal: Terminal,
    dc_terminal: Terminal,
    ac_history: PowerHistory,
    dc_history: PowerHistory,
    battery: BatterySnapshot,
    total_energy_kwh: f64,
    clock: SimClock,
    usage_limit: Option<UsageLimit>,
}

impl PowerSimulator {
    /// Creates a simulator with both terminals off and the battery at its initial SOC.
    ///
    /// # Arguments
    ///
    /// * `config` - Tick timing and history size
    /// * `battery_spec` - Pack capacity, reserve and initial SOC
    /// * `ac_spec` / `ac` - AC terminal nameplate and channel model
    /// * `dc_spec` / `dc` - DC terminal nameplate and channel model
    /// * `clock` - Simulation clock
    pub fn new(
        config: SimConfig,
        battery_spec: BatterySpec,
        ac_spec: TerminalSpec,
        ac: AcChannel,
        dc_spec: TerminalSpec,
        dc: DcChannel,
        clock: SimClock,
    ) -> Self {
        Self {
            ac_history: PowerHistory::new(config.history_max),
            dc_history: PowerHistory::new(config.history_max),
            battery: battery_spec.snapshot_after(0.0),
            ac_terminal: Terminal::new(Channel::Ac, ac_spec),
            dc_terminal: Terminal::new(Channel::Dc, dc_spec),
            config,
            battery_spec,
            ac,
            dc,
            total_energy_kwh: 0.0,
            clock,
            usage_limit: None,
        }
    }

    /// Processes one command. Returns the tick record for `Tick`.
    pub fn handle(&mut self, command: SimCommand) -> Option<TickReport> {
        match command {
            SimCommand::Tick => Some(self.tick()),
            SimCommand::Toggle(channel) => {
                self.toggle(channel);
                None
            }
            SimCommand::StopAll => {
                self.stop_all();
                None
            }
        }
    }

    /// Flips a terminal on or off.
    ///
    /// Switching on seeds a fresh ramp-up; switching off starts a ramp-down
    /// from the terminal's live power.
    pub fn toggle(&mut self, channel: Channel) {
        let (terminal, output): (&mut Terminal, &mut dyn OutputChannel) = match channel {
            Channel::Ac => (&mut self.ac_terminal, &mut self.ac),
            Channel::Dc => (&mut self.dc_terminal, &mut self.dc),
        };
        let turning_on = !terminal.is_on;
        if turning_on {
            output.switch_on();
        } else {
            output.switch_off(terminal.current_power_kw);
        }
        terminal.is_on = turning_on;
        info!(%channel, on = turning_on, power_kw = terminal.current_power_kw, "terminal toggled");
    }

    /// Sets a terminal to `on`, toggling only if it differs. Returns whether a toggle happened.
    pub fn set_channel(&mut self, channel: Channel, on: bool) -> bool {
        if self.terminal(channel).is_on == on {
            return false;
        }
        self.toggle(channel);
        true
    }

    /// Emergency stop: switches off every terminal that is on. Returns the
    /// channels that were toggled.
    pub fn stop_all(&mut self) -> Vec<Channel> {
        let stopped: Vec<Channel> = Channel::ALL
            .into_iter()
            .filter(|&c| self.set_channel(c, false))
            .collect();
        if !stopped.is_empty() {
            info!(count = stopped.len(), "all terminals stopped");
        }
        stopped
    }

    /// Executes one tick: channel power, terminal counters, history, battery.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.tick();
        let tick_sec = self.config.tick_sec;

        let ac_kw = round_to(
            self.ac.power_kw(&ChannelContext::new(
                self.ac_terminal.is_on,
                self.ac_terminal.current_power_kw,
                tick_sec,
            )),
            2,
        );
        let dc_kw = round_to(
            self.dc.power_kw(&ChannelContext::new(
                self.dc_terminal.is_on,
                self.dc_terminal.current_power_kw,
                tick_sec,
            )),
            2,
        );

        let ac_active = self.ac_terminal.is_on || self.ac.is_ramping_down();
        let dc_active = self.dc_terminal.is_on || self.dc.is_ramping_down();
        self.ac_terminal.record(ac_kw, ac_active, tick_sec);
        self.dc_terminal.record(dc_kw, dc_active, tick_sec);

        self.ac_history.push(PowerSample {
            time: now,
            power_kw: ac_kw,
        });
        self.dc_history.push(PowerSample {
            time: now,
            power_kw: dc_kw,
        });

        self.total_energy_kwh += (ac_kw + dc_kw) * tick_sec / 3600.0;
        self.battery = self.battery_spec.snapshot_after(self.total_energy_kwh);

        let report = TickReport {
            tick: self.clock.ticks() - 1,
            time: now,
            ac_phase: self.ac.phase_name(),
            ac_kw,
            ac_on: self.ac_terminal.is_on,
            dc_phase: self.dc.phase_name(),
            dc_kw,
            dc_on: self.dc_terminal.is_on,
            total_kw: round_to(ac_kw + dc_kw, 2),
            soc: self.battery.soc,
            range_km: self.battery.estimated_range_km,
        };
        debug!(
            tick = report.tick,
            ac_kw,
            dc_kw,
            soc = report.soc,
            "tick"
        );
        report
    }

    pub fn terminal(&self, channel: Channel) -> &Terminal {
        match channel {
            Channel::Ac => &self.ac_terminal,
            Channel::Dc => &self.dc_terminal,
        }
    }

    pub fn ac_terminal(&self) -> &Terminal {
        &self.ac_terminal
    }

    pub fn dc_terminal(&self) -> &Terminal {
        &self.dc_terminal
    }

    /// Phase name of the channel's state machine.
    pub fn phase(&self, channel: Channel) -> &'static str {
        match channel {
            Channel::Ac => self.ac.phase_name(),
            Channel::Dc => self.dc.phase_name(),
        }
    }

    pub fn history(&self, channel: Channel) -> &PowerHistory {
        match channel {
            Channel::Ac => &self.ac_history,
            Channel::Dc => &self.dc_history,
        }
    }

    pub fn battery(&self) -> &BatterySnapshot {
        &self.battery
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sum of energy drawn by both terminals since start (kWh).
    pub fn total_energy_kwh(&self) -> f64 {
        self.total_energy_kwh
    }

    /// Instantaneous AC + DC draw, rounded to 2 decimals.
    pub fn total_power_kw(&self) -> f64 {
        round_to(
            self.ac_terminal.current_power_kw + self.dc_terminal.current_power_kw,
            2,
        )
    }

    /// Number of terminals switched on (0, 1 or 2).
    pub fn active_channel_count(&self) -> u8 {
        u8::from(self.ac_terminal.is_on) + u8::from(self.dc_terminal.is_on)
    }

    /// Seconds until the reserve floor at the current draw, `None` when idle.
    pub fn estimated_remaining_secs(&self) -> Option<f64> {
        let power = self.total_power_kw();
        if power <= 0.0 {
            return None;
        }
        Some(self.battery.usable_energy_kwh() / power * 3600.0)
    }

    /// Remaining runtime formatted `"XhYYm"`, or `"—"` when idle.
    pub fn estimated_remaining_time(&self) -> String {
        self.estimated_remaining_secs()
            .map_or_else(|| NO_VALUE.to_string(), format_duration_hm)
    }

    /// Wall-clock `"HH:MM"` at which the reserve floor is reached, or `"—"` when idle.
    pub fn estimated_depletion_time(&self) -> String {
        let Some(secs) = self.estimated_remaining_secs() else {
            return NO_VALUE.to_string();
        };
        match TimeDelta::try_milliseconds((secs * 1000.0) as i64) {
            Some(remaining) => self.clock.time_of_day(self.now() + remaining).to_string(),
            None => NO_VALUE.to_string(),
        }
    }

    /// Caps B2H export at `percent` of capacity, clamped above the reserve.
    pub fn set_usage_limit(&mut self, percent: f64) -> UsageLimit {
        let limit = UsageLimit::clamped(percent, &self.battery);
        info!(percent = limit.percent, kwh = limit.kwh, "usage limit set");
        self.usage_limit = Some(limit);
        limit
    }

    pub fn clear_usage_limit(&mut self) {
        self.usage_limit = None;
    }

    pub fn usage_limit(&self) -> Option<UsageLimit> {
        self.usage_limit
    }

    /// Energy exported through both terminals (kWh).
    pub fn exported_energy_kwh(&self) -> f64 {
        self.ac_terminal.cumulative_energy_kwh + self.dc_terminal.cumulative_energy_kwh
    }

    /// Whether a set usage limit has been reached.
    pub fn usage_limit_reached(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| limit.is_reached(self.exported_energy_kwh()))
    }

    /// Runtime alert, present while at least one terminal is on.
    pub fn usage_alert(&self) -> Option<UsageAlert> {
        if self.active_channel_count() == 0 {
            return None;
        }
        Some(UsageAlert {
            remaining_time: self.estimated_remaining_time(),
            depletion_time: self.estimated_depletion_time(),
        })
    }

    /// Owned copy of every output for display or transport.
    pub fn snapshot(&self) -> SimulatorSnapshot {
        SimulatorSnapshot {
            time: self.now(),
            ticks: self.clock.ticks(),
            ac: self.ac_terminal.clone(),
            dc: self.dc_terminal.clone(),
            ac_phase: self.ac.phase_name(),
            dc_phase: self.dc.phase_name(),
            battery: self.battery,
            ac_history: self.ac_history.to_vec(),
            dc_history: self.dc_history.to_vec(),
            total_power_kw: self.total_power_kw(),
            active_channel_count: self.active_channel_count(),
            estimated_remaining_time: self.estimated_remaining_time(),
            estimated_depletion_time: self.estimated_depletion_time(),
            usage_limit: self.usage_limit,
            usage_limit_reached: self.usage_limit_reached(),
        }
    }
}

/// Point-in-time copy of the simulator outputs.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorSnapshot {
    pub time: DateTime<Utc>,
    pub ticks: u64,
    pub ac: Terminal,
    pub dc: Terminal,
    pub ac_phase: &'static str,
    pub dc_phase: &'static str,
    pub battery: BatterySnapshot,
    pub ac_history: Vec<PowerSample>,
    pub dc_history: Vec<PowerSample>,
    pub total_power_kw: f64,
    pub active_channel_count: u8,
    pub estimated_remaining_time: String,
    pub estimated_depletion_time: String,
    pub usage_limit: Option<UsageLimit>,
    pub usage_limit_reached: bool,
}
