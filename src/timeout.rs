//! Wait bounds for the blocking operations.

use std::time::{Duration, Instant};

/// How long a blocking call may park the calling thread.
///
/// A plain [`Duration`] converts into `Timeout::After`; a zero duration
/// behaves like `Poll`.
///
/// ```rust
/// use bounded_blocking_map::Timeout;
/// use std::time::Duration;
///
/// let t: Timeout = Duration::from_millis(250).into();
/// assert_eq!(t, Timeout::After(Duration::from_millis(250)));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until the condition holds or the map is closed.
    Never,
    /// Check the condition once without parking.
    Poll,
    /// Wait at most this long.
    After(Duration),
}

/// Absolute form of a [`Timeout`], fixed when a wait starts so that spurious
/// wakeups do not extend it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Deadline {
    Never,
    Now,
    At(Instant),
}

impl Timeout {
    pub(crate) fn deadline(self) -> Deadline {
        match self {
            Timeout::Never => Deadline::Never,
            Timeout::Poll => Deadline::Now,
            Timeout::After(d) if d.is_zero() => Deadline::Now,
            // Durations too large to represent as an Instant wait forever.
            Timeout::After(d) => Instant::now()
                .checked_add(d)
                .map_or(Deadline::Never, Deadline::At),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::After(d)
    }
}

impl From<Option<Duration>> for Timeout {
    /// `None` waits forever.
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Timeout::Never, Timeout::After)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_polls() {
        assert_eq!(Timeout::After(Duration::ZERO).deadline(), Deadline::Now);
        assert_eq!(Timeout::Poll.deadline(), Deadline::Now);
        assert_eq!(Timeout::Never.deadline(), Deadline::Never);
    }

    #[test]
    fn finite_duration_is_in_the_future() {
        let before = Instant::now();
        match Timeout::from(Duration::from_millis(50)).deadline() {
            Deadline::At(at) => assert!(at >= before + Duration::from_millis(50)),
            other => panic!("unexpected deadline: {:?}", other),
        }
    }

    #[test]
    fn overflowing_duration_waits_forever() {
        assert_eq!(Timeout::After(Duration::MAX).deadline(), Deadline::Never);
        assert_eq!(Timeout::from(None::<Duration>), Timeout::Never);
    }
}
