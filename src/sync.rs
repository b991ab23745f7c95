//! Hooks for reconciling the planner's B2H state with the simulator terminals.
//!
//! The simulator and the planner each keep their own on/off flags. Neither
//! side reaches into the other; the host reads one side with these helpers and
//! writes the result into the other.

use crate::journey::B2hState;
use crate::sim::{Channel, Terminal};

/// Planner B2H state mirroring the terminals' on/off flags.
///
/// Power levels come from a terminal's live draw while it is on and
/// delivering, otherwise from `fallback`.
pub fn b2h_from_terminals(ac: &Terminal, dc: &Terminal, fallback: &B2hState) -> B2hState {
    let live = |t: &Terminal, default_kw: f64| {
        if t.is_on && t.current_power_kw > 0.0 {
            t.current_power_kw
        } else {
            default_kw
        }
    };
    B2hState {
        ac_on: ac.is_on,
        dc_on: dc.is_on,
        ac_power_kw: live(ac, fallback.ac_power_kw),
        dc_power_kw: live(dc, fallback.dc_power_kw),
    }
}

/// Copies only the on/off flags from the terminals, keeping `current`'s power levels.
pub fn b2h_flags_from_terminals(ac: &Terminal, dc: &Terminal, current: &B2hState) -> B2hState {
    B2hState {
        ac_on: ac.is_on,
        dc_on: dc.is_on,
        ..*current
    }
}

/// Simulator toggles needed for the terminals to match `desired`.
pub fn toggles_to_match(ac: &Terminal, dc: &Terminal, desired: &B2hState) -> Vec<Channel> {
    let mut toggles = Vec::with_capacity(2);
    if ac.is_on != desired.ac_on {
        toggles.push(Channel::Ac);
    }
    if dc.is_on != desired.dc_on {
        toggles.push(Channel::Dc);
    }
    toggles
}
