//! CSV export for tick telemetry and itinerary segments.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::journey::{JourneySegment, SegmentKind};
use crate::sim::TickReport;

/// Column header for per-tick telemetry.
const TICK_HEADER: &str = "tick,time,ac_phase,ac_kw,dc_phase,dc_kw,total_kw,soc,range_km";

/// Column header for itinerary segments.
const SEGMENT_HEADER: &str = "from,to,type,start,end,duration_min,distance_km,\
                              soc_start,soc_end,energy_kwh,b2h_kwh,charge_kwh";

/// Exports tick records to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_ticks_csv(reports: &[TickReport], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_ticks_csv(reports, io::BufWriter::new(file))
}

/// Writes tick records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_ticks_csv(reports: &[TickReport], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TICK_HEADER.split(','))?;

    for r in reports {
        wtr.write_record(&[
            r.tick.to_string(),
            r.time.to_rfc3339(),
            r.ac_phase.to_string(),
            format!("{:.2}", r.ac_kw),
            r.dc_phase.to_string(),
            format!("{:.2}", r.dc_kw),
            format!("{:.2}", r.total_kw),
            format!("{:.2}", r.soc),
            format!("{:.1}", r.range_km),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports itinerary segments to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_segments_csv(segments: &[JourneySegment], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_segments_csv(segments, io::BufWriter::new(file))
}

/// Writes itinerary segments as CSV. Columns that do not apply to a segment type are empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_segments_csv(segments: &[JourneySegment], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SEGMENT_HEADER.split(',').map(str::trim))?;

    for s in segments {
        let (distance, energy, b2h, charge) = match &s.kind {
            SegmentKind::Driving(leg) => (
                format!("{:.1}", leg.distance_km),
                format!("{:.1}", leg.energy_consumed_kwh),
                format!("{:.1}", leg.b2h_consumed_kwh),
                String::new(),
            ),
            SegmentKind::Charging(c) => (
                String::new(),
                String::new(),
                String::new(),
                format!("{:.1}", c.charge_amount_kwh),
            ),
        };
        wtr.write_record(&[
            s.from_id.clone(),
            s.to_id.clone(),
            s.type_name().to_string(),
            s.start_time.to_string(),
            s.end_time.to_string(),
            s.duration_min.to_string(),
            distance,
            format!("{:.1}", s.soc_start),
            format!("{:.1}", s.soc_end),
            energy,
            b2h,
            charge,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn make_report(t: u64) -> TickReport {
        TickReport {
            tick: t,
            time: Utc.with_ymd_and_hms(2025, 6, 1, 5, 30, 0).unwrap()
                + TimeDelta::seconds(2 * t as i64),
            ac_phase: "running",
            ac_kw: 2.41,
            ac_on: true,
            dc_phase: "compressor_on",
            dc_kw: 4.02,
            dc_on: true,
            total_kw: 6.43,
            soc: 71.95,
            range_km: 147.5,
        }
    }

    #[test]
    fn tick_header_and_rows() {
        let reports: Vec<TickReport> = (0..24).map(make_report).collect();
        let mut buf = Vec::new();
        write_ticks_csv(&reports, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], TICK_HEADER);
        assert_eq!(lines.len(), 25);
        assert!(lines[1].starts_with("0,2025-06-01T05:30:00+00:00,running,2.41,"));
    }

    #[test]
    fn segment_rows_leave_inapplicable_columns_empty() {
        let planner = ScenarioConfig::demo().build_planner().unwrap();
        let segments = &planner.journey().segments;
        let mut buf = Vec::new();
        write_segments_csv(segments, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().map(csv::StringRecord::len).ok(), Some(12));
        let rows: Vec<csv::StringRecord> = rdr.records().filter_map(Result::ok).collect();
        assert_eq!(rows.len(), segments.len());

        let charge = &rows[1];
        assert_eq!(&charge[2], "charging");
        assert_eq!(&charge[6], "");
        assert!(charge[11].parse::<f64>().is_ok());

        let drive = &rows[0];
        assert_eq!(&drive[2], "driving");
        assert_eq!(&drive[3], "14:30");
        assert_eq!(&drive[11], "");
    }

    #[test]
    fn deterministic_output() {
        let reports: Vec<TickReport> = (0..5).map(make_report).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_ticks_csv(&reports, &mut buf1).unwrap();
        write_ticks_csv(&reports, &mut buf2).unwrap();
        assert_eq!(buf1, buf2);
    }
}
