//! Post-hoc summary computed from a session's tick records.

use std::fmt;

use serde::Serialize;

use super::types::TickReport;

/// Aggregate indicators derived from a complete simulator session.
///
/// Computed from `Vec<TickReport>` so the printed summary always agrees
/// with the exported telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Number of ticks simulated.
    pub ticks: usize,
    /// Energy delivered through the AC terminal (kWh).
    pub ac_energy_kwh: f64,
    /// Energy delivered through the DC terminal (kWh).
    pub dc_energy_kwh: f64,
    /// Highest combined draw seen on any tick (kW).
    pub peak_total_kw: f64,
    /// Mean combined draw over all ticks (kW).
    pub mean_total_kw: f64,
    /// Ticks with non-zero AC output.
    pub ac_active_ticks: usize,
    /// Ticks with non-zero DC output.
    pub dc_active_ticks: usize,
    /// DC compressor transitions (inrush ticks).
    pub inrush_events: usize,
    /// SOC after the last tick (%).
    pub final_soc: f64,
    /// Range after the last tick (km).
    pub final_range_km: f64,
}

impl SessionSummary {
    /// Computes the summary from the complete tick record vector.
    ///
    /// # Arguments
    ///
    /// * `reports` - Tick records in order
    /// * `tick_sec` - Tick length in seconds
    /// * `initial_soc` - SOC reported when no tick ran
    pub fn from_reports(reports: &[TickReport], tick_sec: f64, initial_soc: f64) -> Self {
        let mut ac_energy = 0.0;
        let mut dc_energy = 0.0;
        let mut peak = 0.0_f64;
        let mut total_sum = 0.0;
        let mut ac_active = 0;
        let mut dc_active = 0;
        let mut inrush = 0;

        for r in reports {
            ac_energy += r.ac_kw * tick_sec / 3600.0;
            dc_energy += r.dc_kw * tick_sec / 3600.0;
            peak = peak.max(r.total_kw);
            total_sum += r.total_kw;
            if r.ac_kw > 0.0 {
                ac_active += 1;
            }
            if r.dc_kw > 0.0 {
                dc_active += 1;
            }
            if matches!(r.dc_phase, "spike_to_off" | "spike_to_on") {
                inrush += 1;
            }
        }

        let (final_soc, final_range_km) = reports
            .last()
            .map_or((initial_soc, 0.0), |r| (r.soc, r.range_km));
        let mean_total_kw = if reports.is_empty() {
            0.0
        } else {
            total_sum / reports.len() as f64
        };

        Self {
            ticks: reports.len(),
            ac_energy_kwh: ac_energy,
            dc_energy_kwh: dc_energy,
            peak_total_kw: peak,
            mean_total_kw,
            ac_active_ticks: ac_active,
            dc_active_ticks: dc_active,
            inrush_events: inrush,
            final_soc,
            final_range_km,
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- B2H Session Summary ---")?;
        writeln!(f, "Ticks simulated:       {}", self.ticks)?;
        writeln!(
            f,
            "AC energy:             {:.3} kWh ({} active ticks)",
            self.ac_energy_kwh, self.ac_active_ticks
        )?;
        writeln!(
            f,
            "DC energy:             {:.3} kWh ({} active ticks, {} inrush)",
            self.dc_energy_kwh, self.dc_active_ticks, self.inrush_events
        )?;
        writeln!(f, "Peak draw:             {:.2} kW", self.peak_total_kw)?;
        writeln!(f, "Mean draw:             {:.2} kW", self.mean_total_kw)?;
        write!(
            f,
            "Final SoC:             {:.2}% ({:.1} km)",
            self.final_soc, self.final_range_km
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_report(ac_kw: f64, dc_kw: f64, dc_phase: &'static str, soc: f64) -> TickReport {
        TickReport {
            tick: 0,
            time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ac_phase: if ac_kw > 0.0 { "running" } else { "off" },
            ac_kw,
            ac_on: ac_kw > 0.0,
            dc_phase,
            dc_kw,
            dc_on: dc_kw > 0.0,
            total_kw: ac_kw + dc_kw,
            soc,
            range_km: soc * 2.05,
        }
    }

    #[test]
    fn energy_integration() {
        // 1800 ticks of 2s at 2 kW = 1 hour = 2 kWh
        let reports = vec![make_report(2.0, 0.0, "off", 70.0); 1800];
        let s = SessionSummary::from_reports(&reports, 2.0, 72.0);
        assert!((s.ac_energy_kwh - 2.0).abs() < 1e-9);
        assert_eq!(s.dc_energy_kwh, 0.0);
        assert_eq!(s.ac_active_ticks, 1800);
    }

    #[test]
    fn peak_and_inrush() {
        let reports = vec![
            make_report(2.0, 4.0, "compressor_on", 71.9),
            make_report(2.0, 5.0, "spike_to_off", 71.8),
            make_report(2.0, 0.5, "compressor_off", 71.7),
            make_report(2.0, 5.0, "spike_to_on", 71.6),
        ];
        let s = SessionSummary::from_reports(&reports, 2.0, 72.0);
        assert_eq!(s.peak_total_kw, 7.0);
        assert_eq!(s.inrush_events, 2);
        assert_eq!(s.final_soc, 71.6);
    }

    #[test]
    fn empty_reports() {
        let s = SessionSummary::from_reports(&[], 2.0, 72.0);
        assert_eq!(s.ticks, 0);
        assert_eq!(s.mean_total_kw, 0.0);
        assert_eq!(s.final_soc, 72.0);
        assert!(!format!("{s}").is_empty());
    }
}
