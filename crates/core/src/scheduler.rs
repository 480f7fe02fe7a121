// SPDX-License-Identifier: MIT

//! Rescan priority math (C7, §4.3). Pure: no I/O, no clock reads — callers
//! in `hygiene-engine` supply `now` and the observed severities.

/// Priority axis is `[-16, 1]`; lower is more urgent (§4.3).
pub const PRIORITY_MIN: i32 = -16;
pub const PRIORITY_MAX: i32 = 1;
pub const UP_REST_PRIORITY: i32 = -1;
pub const DOWN_REST_PRIORITY: i32 = 1;

/// `max_sev → target priority` anchor table (§4.3).
const SEVERITY_ANCHORS: [(u8, i32); 4] = [(4, -16), (3, -8), (2, -4), (1, -2)];

/// Hours-until-next-scan anchor table, ordered by descending priority so
/// `hours_for_priority` can interpolate between adjacent entries (§4.3).
const HOURS_ANCHORS: [(i32, f64); 6] = [
    (1, 2160.0),
    (0, 336.0),
    (-1, 168.0),
    (-4, 96.0),
    (-8, 24.0),
    (-16, 12.0),
];

/// Map the worst observed severity (4=critical..1=low) to its target
/// priority anchor (§4.3). Returns `None` for `max_sev == 0` (vuln-free).
pub fn priority_for_severity(max_sev: u8) -> Option<i32> {
    SEVERITY_ANCHORS
        .iter()
        .find(|&&(sev, _)| sev == max_sev.clamp(1, 4))
        .map(|&(_, p)| p)
}

/// Linear interpolation over `HOURS_ANCHORS`, clamping out-of-range
/// priorities to the nearest anchor (§4.3).
pub fn hours_for_priority(priority: i32) -> f64 {
    let p = priority.clamp(PRIORITY_MIN, PRIORITY_MAX);
    if let Some(&(_, hours)) = HOURS_ANCHORS.iter().find(|&&(anchor, _)| anchor == p) {
        return hours;
    }
    // HOURS_ANCHORS is sorted by descending priority; find the bracketing pair.
    for window in HOURS_ANCHORS.windows(2) {
        let (hi_p, hi_h) = window[0];
        let (lo_p, lo_h) = window[1];
        if p < hi_p && p > lo_p {
            let span = (hi_p - lo_p) as f64;
            let frac = (p - lo_p) as f64 / span;
            return lo_h + frac * (hi_h - lo_h);
        }
    }
    unreachable!("priority {p} not covered by anchor table after clamping")
}

/// Outcome of `adjust_priority` (§4.3): the new priority plus whether it
/// changed, so callers can skip a no-op tally/store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityAdjustment {
    pub priority: i32,
    pub changed: bool,
}

/// Recompute a DONE host's priority (§4.3 "When invoked on a DONE host").
///
/// `max_sev` is the max severity among open, non-false-positive tickets for
/// this IP (0 meaning vuln-free); ignored when `up=false`.
pub fn adjust_priority(current: i32, up: bool, max_sev: u8) -> PriorityAdjustment {
    if !up {
        let next = (current + 1).min(DOWN_REST_PRIORITY);
        return PriorityAdjustment {
            priority: next,
            changed: next != current,
        };
    }

    let next = match priority_for_severity(max_sev) {
        Some(target) => {
            if target == current {
                current
            } else if target < current {
                target
            } else {
                current + 1
            }
        }
        None => {
            if current < UP_REST_PRIORITY {
                current + 1
            } else if current > UP_REST_PRIORITY {
                UP_REST_PRIORITY
            } else {
                current
            }
        }
    };
    PriorityAdjustment {
        priority: next,
        changed: next != current,
    }
}
