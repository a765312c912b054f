//! Boot-relative time for row timestamps and window bounds.

use airq_core::acquisition::Clock;

/// Seconds since boot. Rows written by this build are timestamped on the
/// boot-relative scale; the trailing-window query works the same either
/// way because only differences matter.
pub struct BootClock;

impl Clock for BootClock {
    fn now_secs(&mut self) -> u32 {
        embassy_time::Instant::now().as_secs() as u32
    }
}
