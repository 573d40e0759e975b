use std::{fmt, mem, time};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// Timestamp consisting of a seconds and a microseconds component
pub struct Timestamp {
    pub sec: libc::time_t,
    pub usec: libc::time_t,
}

impl Timestamp {
    /// Returns a timestamp representation
    ///
    /// # Arguments
    ///
    /// * `sec` - Seconds
    /// * `usec` - Microseconds
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::Timestamp;
    /// let ts = Timestamp::new(5, 5);
    /// ```
    pub fn new(sec: libc::time_t, usec: libc::time_t) -> Self {
        Timestamp { sec, usec }
    }

    /// Reads the monotonic clock
    ///
    /// Completed buffers are stamped with this clock at end of frame.
    pub fn monotonic() -> Self {
        let mut ts: libc::timespec = unsafe { mem::zeroed() };
        // CLOCK_MONOTONIC cannot fail with a valid timespec pointer
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }

        Timestamp {
            sec: ts.tv_sec,
            usec: (ts.tv_nsec / 1000) as libc::time_t,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let floating: f64 = self.sec as f64 + self.usec as f64 / 1_000_000.0;
        write!(f, "{} [s]", floating)
    }
}

impl From<time::Duration> for Timestamp {
    fn from(duration: time::Duration) -> Self {
        Timestamp::new(
            duration.as_secs() as libc::time_t,
            duration.subsec_micros() as libc::time_t,
        )
    }
}

impl From<Timestamp> for time::Duration {
    fn from(ts: Timestamp) -> Self {
        time::Duration::new(ts.sec as u64, (ts.usec * 1000) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_does_not_go_backwards() {
        let a = Timestamp::monotonic();
        let b = Timestamp::monotonic();
        assert!(b >= a);
    }

    #[test]
    fn duration_conversion() {
        let ts = Timestamp::from(time::Duration::from_micros(2_500_001));
        assert_eq!(ts, Timestamp::new(2, 500_001));
        assert_eq!(time::Duration::from(ts), time::Duration::from_micros(2_500_001));
    }
}
