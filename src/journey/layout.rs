//! Timeline sizing hints derived from segment durations.

use serde::Serialize;

use super::types::JourneySegment;

/// Height budget for the vertical timeline, in abstract units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutParams {
    pub total_height: f64,
    pub min_driving_height: f64,
    pub min_charging_height: f64,
    /// Height taken by the origin node above the first segment.
    pub origin_offset: f64,
    /// Pulled back from the first charging offset to align the detail panel.
    pub detail_adjust: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            total_height: 920.0,
            min_driving_height: 120.0,
            min_charging_height: 80.0,
            origin_offset: 42.0,
            detail_adjust: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLayout {
    /// One height per segment, in segment order.
    pub heights: Vec<f64>,
    /// Offset of the first charging segment, if any.
    pub first_charging_offset: Option<f64>,
}

/// Allocates heights proportional to duration with a per-type floor.
pub fn segment_layout(
    segments: &[JourneySegment],
    total_duration_min: u32,
    params: &LayoutParams,
) -> SegmentLayout {
    let heights: Vec<f64> = segments
        .iter()
        .map(|seg| {
            let proportional = if total_duration_min > 0 {
                f64::from(seg.duration_min) / f64::from(total_duration_min) * params.total_height
            } else {
                0.0
            };
            let floor = if seg.is_driving() {
                params.min_driving_height
            } else {
                params.min_charging_height
            };
            proportional.max(floor)
        })
        .collect();

    let first_charging_offset = segments.iter().position(JourneySegment::is_charging).map(|idx| {
        params.origin_offset + heights[..idx].iter().sum::<f64>() - params.detail_adjust
    });

    SegmentLayout {
        heights,
        first_charging_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::types::{ChargingLeg, DrivingLeg, SegmentKind};

    fn seg(duration_min: u32, driving: bool) -> JourneySegment {
        let kind = if driving {
            SegmentKind::Driving(DrivingLeg {
                distance_km: 0.0,
                energy_consumed_kwh: 0.0,
                b2h_consumed_kwh: 0.0,
                b2h_ac_consumed_kwh: 0.0,
                b2h_dc_consumed_kwh: 0.0,
            })
        } else {
            SegmentKind::Charging(ChargingLeg {
                charge_amount_kwh: 0.0,
            })
        };
        let t = "00:00".parse().unwrap();
        JourneySegment {
            from_id: "a".into(),
            to_id: "b".into(),
            label: String::new(),
            duration_min,
            soc_start: 0.0,
            soc_end: 0.0,
            start_time: t,
            end_time: t,
            kind,
        }
    }

    #[test]
    fn short_legs_get_minimum_height() {
        let segs = vec![seg(180, true), seg(10, false), seg(40, true)];
        let layout = segment_layout(&segs, 230, &LayoutParams::default());
        assert!((layout.heights[0] - 180.0 / 230.0 * 920.0).abs() < 1e-9);
        assert_eq!(layout.heights[1], 80.0);
        assert_eq!(layout.heights[2], 160.0);
    }

    #[test]
    fn offset_counts_segments_before_first_charge() {
        let segs = vec![seg(10, true), seg(10, false), seg(100, true)];
        let layout = segment_layout(&segs, 120, &LayoutParams::default());
        assert_eq!(layout.first_charging_offset, Some(42.0 + 120.0 - 10.0));
    }

    #[test]
    fn zero_duration_uses_floors() {
        let segs = vec![seg(0, true)];
        let layout = segment_layout(&segs, 0, &LayoutParams::default());
        assert_eq!(layout.heights, vec![120.0]);
        assert_eq!(layout.first_charging_offset, None);
    }
}
