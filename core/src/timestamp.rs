/*!
The [`Timestamp`] type.
*/

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/**
A point in time, as whole milliseconds since the Unix epoch.

Timestamps carry millisecond precision. Converting to nanoseconds is exact.
*/
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /**
    Create a timestamp from a number of milliseconds since the Unix epoch.
    */
    pub const fn from_unix_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /**
    Get the current wall-clock time, truncated to milliseconds.

    A clock set before the Unix epoch reads as the epoch itself.
    */
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);

        Timestamp(since_epoch.as_millis() as u64)
    }

    pub const fn as_unix_millis(&self) -> u64 {
        self.0
    }

    /**
    Get the number of nanoseconds since the Unix epoch.

    This is `millis * 1_000_000`, computed in integer arithmetic. Timestamps past the year 2554
    saturate at `u64::MAX` nanoseconds.
    */
    pub const fn as_unix_nanos(&self) -> u64 {
        self.0.saturating_mul(1_000_000)
    }

    pub fn as_unix_time(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Timestamp::from_unix_millis(millis)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
