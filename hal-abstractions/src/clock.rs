//! Time sources

/// Monotonic millisecond counter, starting at an arbitrary origin.
pub trait Monotonic {
    /// Milliseconds since the counter's origin.
    fn now_ms(&self) -> u64;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Calendar clock in Unix seconds (UTC).
///
/// Reports `0` (or any value the board happens to boot with) until an
/// external time source has set it.
pub trait WallClock {
    /// Seconds since 1970-01-01T00:00:00Z.
    fn unix_secs(&self) -> u64;
}

impl<T: WallClock + ?Sized> WallClock for &T {
    fn unix_secs(&self) -> u64 {
        (**self).unix_secs()
    }
}

/// External time synchronization service (SNTP on real hardware).
///
/// `request_sync` only starts synchronization; completion is observed by
/// polling a [`WallClock`].
pub trait TimeSource {
    /// Kick off synchronization against `servers`, tried in order.
    fn request_sync(&mut self, servers: &'static [&'static str]);
}
