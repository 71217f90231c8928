//! Human-readable time formatting for chat output
//!
//! Track durations and playback progress are shown to chat users as
//! zero-padded clock strings and a fixed-width progress bar.

use std::time::Duration;

/// Number of cells in the progress bar
pub const PROGRESS_BAR_CELLS: usize = 10;

const CELL_PLAYED: &str = "🟦";
const CELL_CURSOR: &str = "🔶";
const CELL_REMAINING: &str = "➖";

/// Format a duration as `HH:MM:SS`, rounded to the nearest second.
///
/// Hours are not wrapped at 24, so a 30 hour stream reads `30:00:00`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use jukebox_common::human_time::format_clock;
///
/// assert_eq!(format_clock(Duration::from_secs(0)), "00:00:00");
/// assert_eq!(format_clock(Duration::from_secs(213)), "00:03:33");
/// assert_eq!(format_clock(Duration::from_millis(3_661_600)), "01:01:02");
/// ```
pub fn format_clock(duration: Duration) -> String {
    let total_secs = (duration.as_millis() + 500) / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Index of the cursor cell for a given playback position.
///
/// Returns 0 for an unknown (zero) total, and a value of
/// [`PROGRESS_BAR_CELLS`] or more once `elapsed` passes `total`.
pub fn progress_cell(total: Duration, elapsed: Duration) -> usize {
    if total.is_zero() {
        return 0;
    }
    let fraction = elapsed.as_secs_f64() / total.as_secs_f64();
    (fraction * PROGRESS_BAR_CELLS as f64) as usize
}

/// Render a progress bar: played cells, a cursor, then remaining cells.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use jukebox_common::human_time::progress_bar;
///
/// let bar = progress_bar(Duration::from_secs(100), Duration::from_secs(35));
/// assert_eq!(bar, "🟦🟦🟦🔶➖➖➖➖➖➖");
/// ```
pub fn progress_bar(total: Duration, elapsed: Duration) -> String {
    let cursor = progress_cell(total, elapsed);
    (0..PROGRESS_BAR_CELLS)
        .map(|i| {
            if i == cursor {
                CELL_CURSOR
            } else if i < cursor {
                CELL_PLAYED
            } else {
                CELL_REMAINING
            }
        })
        .collect()
}
