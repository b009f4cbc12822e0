// SPDX-License-Identifier: MIT OR Apache-2.0
//! Logical game-clock helpers.
//!
//! All positions on the shared timeline are whole milliseconds from game
//! start. Director's Cut selections are stored in seconds, so conversions
//! between the two live here as well.

/// Milliseconds on the logical game clock
pub type Millis = u64;

/// Default snap grid (100ms)
pub const DEFAULT_GRID_MS: Millis = 100;

const MILLIS_PER_SECOND: f64 = 1000.0;

/// Snap a position to the nearest grid line.
///
/// Halfway values round up. A grid of 0 disables snapping. Snapping is
/// idempotent: `snap_to_grid(snap_to_grid(x, g), g) == snap_to_grid(x, g)`.
pub fn snap_to_grid(position: Millis, grid: Millis) -> Millis {
    if grid == 0 {
        return position;
    }
    let remainder = position % grid;
    if remainder * 2 >= grid {
        position - remainder + grid
    } else {
        position - remainder
    }
}

/// Snap a position up to the next grid line (or keep it if already on one)
pub fn snap_up(position: Millis, grid: Millis) -> Millis {
    if grid == 0 {
        return position;
    }
    position.div_ceil(grid) * grid
}

/// Snap a signed position down to the previous grid line.
///
/// Used by left shifts, which may compute positions before zero.
pub fn snap_down(position: i64, grid: Millis) -> i64 {
    if grid == 0 {
        return position;
    }
    let grid = grid as i64;
    position.div_euclid(grid) * grid
}

/// Convert milliseconds to seconds
pub fn millis_to_seconds(ms: Millis) -> f64 {
    ms as f64 / MILLIS_PER_SECOND
}

/// Convert seconds to milliseconds, rounding to the nearest millisecond.
/// Negative input clamps to zero.
pub fn seconds_to_millis(seconds: f64) -> Millis {
    (seconds * MILLIS_PER_SECOND).round().max(0.0) as Millis
}

/// Format a logical time as `m:ss`, or `h:mm:ss` past the hour
pub fn format_clock(ms: Millis) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
