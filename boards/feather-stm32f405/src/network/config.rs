#![deny(unsafe_code)]
#![deny(warnings)]
//! Board network configuration structures

/// SNTP client configuration
///
/// The server list itself comes from the core time configuration with each
/// sync request.
#[derive(Debug, Clone)]
pub struct SntpConfig {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of retry attempts per server
    pub retry_count: usize,
    /// Maximum accepted stratum level (1-15)
    pub max_stratum: u8,
    /// Resync interval after the first successful sync
    pub resync_secs: u64,
}

impl Default for SntpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            retry_count: 3,
            max_stratum: 3,
            resync_secs: 15 * 60,
        }
    }
}

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
    /// How long one link attempt waits for a DHCP lease
    pub dhcp_wait_ms: u64,
    /// TCP inactivity timeout for HTTPS connections
    pub tcp_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            seed: 0x1234_5678_u64,
            dhcp_wait_ms: 5_000,
            tcp_timeout_ms: 10_000,
        }
    }
}
