//! Verbosity-count-to-subscriber wiring shared by `xferd` and `xfer`.
//!
//! Both binaries count repeated `-v` occurrences on their CLI and pass the
//! count here; everything downstream logs through the `tracing` macros.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps a `-v` occurrence count to a tracing filter level: `0` → `INFO`,
/// `1` → `DEBUG`, `2` or more → `TRACE`.
#[must_use]
pub const fn level_for_verbosity(count: u8) -> Level {
    match count {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a process-wide `tracing_subscriber::fmt` subscriber at the
/// level implied by `verbosity`. Returns an error if a global subscriber is
/// already installed (e.g. called twice, or under a test harness that sets
/// its own).
pub fn init(verbosity: u8) -> Result<(), tracing_subscriber::util::TryInitError> {
    let level = level_for_verbosity(verbosity);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_zero_maps_to_info() {
        assert_eq!(level_for_verbosity(0), Level::INFO);
    }

    #[test]
    fn verbosity_one_maps_to_debug() {
        assert_eq!(level_for_verbosity(1), Level::DEBUG);
    }

    #[test]
    fn verbosity_two_and_above_maps_to_trace() {
        assert_eq!(level_for_verbosity(2), Level::TRACE);
        assert_eq!(level_for_verbosity(9), Level::TRACE);
    }
}
