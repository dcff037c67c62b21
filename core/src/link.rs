//! Network link bring-up

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::NetworkLink;

use crate::config::LinkConfig;

/// Block until `link` is up, retrying forever with a fixed delay.
///
/// Returns the number of attempts it took.
pub async fn bring_up<L: NetworkLink, D: DelayNs>(
    link: &mut L,
    delay: &mut D,
    config: &LinkConfig,
) -> u32 {
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match link.connect().await {
            Ok(()) => {
                info!("Network link up after {} attempt(s)", attempts);
                return attempts;
            }
            Err(e) => {
                debug!("Link attempt {} failed: {}", attempts, e);
                delay.delay_ms(config.retry_delay_ms).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyLink, SimClock};
    use embassy_futures::block_on;
    use hal_abstractions::Monotonic;

    #[test]
    fn test_link_up_first_try() {
        let mut link = FlakyLink::failing(0);
        let mut clock = SimClock::new();
        let attempts = block_on(bring_up(&mut link, &mut clock, &LinkConfig::default()));
        assert_eq!(attempts, 1);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_retries_with_fixed_delay() {
        let mut link = FlakyLink::failing(7);
        let mut clock = SimClock::new();
        let attempts = block_on(bring_up(&mut link, &mut clock, &LinkConfig::default()));
        assert_eq!(attempts, 8);
        assert_eq!(link.attempts, 8);
        // No backoff: seven failures, seven 500 ms waits
        assert_eq!(clock.now_ms(), 7 * 500);
    }
}
