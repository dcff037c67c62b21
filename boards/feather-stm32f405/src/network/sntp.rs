#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP client writing the internal RTC
//!
//! The uploader asks for a sync through [`SntpTrigger`] and then polls the
//! RTC. [`SntpClient::serve`] runs next to the network runners, answers
//! those requests and keeps the RTC disciplined afterwards.

use defmt::{error, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use hal_abstractions::TimeSource;
use rtic_monotonics::fugit::ExtU64;
use rtic_monotonics::Monotonic;

use crate::time::{write_rtc, RtcError, Timestamp};
use crate::Mono;

use super::config::SntpConfig;
use super::error::NetworkError;

type ServerList = &'static [&'static str];

static SYNC_REQUEST: Signal<CriticalSectionRawMutex, ServerList> = Signal::new();

impl From<RtcError> for NetworkError {
    fn from(e: RtcError) -> Self {
        match e {
            RtcError::NotInitialized => NetworkError::RtcNotInitialized,
            RtcError::HardwareError | RtcError::OutOfRange => NetworkError::RtcHardwareError,
        }
    }
}

/// Handle the uploader uses to start synchronization
#[derive(Debug, Clone, Copy, Default)]
pub struct SntpTrigger;

impl TimeSource for SntpTrigger {
    fn request_sync(&mut self, servers: &'static [&'static str]) {
        info!("SNTP sync requested ({} servers)", servers.len());
        SYNC_REQUEST.signal(servers);
    }
}

/// SNTP client for time synchronization
pub struct SntpClient {
    config: SntpConfig,
}

impl SntpClient {
    pub fn new(config: SntpConfig) -> Self {
        Self { config }
    }

    /// Serve sync requests forever.
    ///
    /// Idle until the first request; after that the last requested server
    /// list is re-synced every `resync_secs`, or sooner on a new request.
    pub async fn serve(&self, stack: Stack<'static>) -> ! {
        let mut servers = SYNC_REQUEST.wait().await;
        loop {
            match self.sync(stack, servers).await {
                Ok(ts) => info!("SNTP sync successful: {}.{:06} UTC", ts.unix_secs, ts.micros),
                Err(e) => warn!("SNTP sync failed: {}", e),
            }
            let resync = Mono::delay(self.config.resync_secs.secs());
            if let Either::Second(requested) = select(resync, SYNC_REQUEST.wait()).await {
                servers = requested;
            } else {
                info!("SNTP resync triggered");
            }
        }
    }

    /// Try each server in order, with retries, until one answers.
    async fn sync(&self, stack: Stack<'static>, servers: ServerList) -> Result<Timestamp, NetworkError> {
        for server in servers {
            for attempt in 0..self.config.retry_count {
                info!("Attempting SNTP sync with {} (attempt {})", server, attempt + 1);
                match self.sntp_request(stack, server).await {
                    Ok(timestamp) => {
                        write_rtc(timestamp)?;
                        return Ok(timestamp);
                    }
                    Err(e) => {
                        warn!("SNTP request failed: {}, retrying...", e);
                        Mono::delay(2000_u64.millis()).await;
                    }
                }
            }
        }
        error!("All SNTP sync attempts failed");
        Err(NetworkError::AllServersFailed)
    }

    async fn sntp_request(&self, stack: Stack<'static>, server: &str) -> Result<Timestamp, NetworkError> {
        let server_ip = stack
            .dns_query(server, DnsQueryType::A)
            .await
            .map_err(|_| NetworkError::DnsError)?
            .first()
            .copied()
            .ok_or(NetworkError::DnsError)?;

        let server_endpoint = IpEndpoint::new(server_ip, 123);
        info!("Resolved {} to {}", server, Debug2Format(&server_endpoint));

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NetworkError::SocketError)?;

        // LI=0, VN=3, Mode=3 (client)
        let mut ntp_packet = [0u8; 48];
        ntp_packet[0] = 0x1B;
        let transmit_time = Instant::now();
        socket
            .send_to(&ntp_packet, server_endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)?;

        let mut response = [0u8; 48];
        let timeout = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let (recv_len, from_addr) = match select(timeout, socket.recv_from(&mut response)).await {
            Either::First(_) => return Err(NetworkError::Timeout),
            Either::Second(result) => result.map_err(|_| NetworkError::SocketError)?,
        };
        let receive_time = Instant::now();

        if recv_len < 48 || from_addr.endpoint.addr != server_ip {
            return Err(NetworkError::InvalidResponse);
        }

        let stratum = response[1];
        if stratum == 0 || stratum > self.config.max_stratum {
            warn!("Invalid stratum {} (max {})", stratum, self.config.max_stratum);
            return Err(NetworkError::ServerError);
        }

        let tx_secs =
            u64::from(u32::from_be_bytes([response[40], response[41], response[42], response[43]]));
        let tx_frac = u32::from_be_bytes([response[44], response[45], response[46], response[47]]);

        // Half the round trip is spent on the way back
        let rtt_correction_micros = receive_time.duration_since(transmit_time).as_micros() / 2;

        let mut timestamp = Timestamp::from_ntp(tx_secs, tx_frac);
        timestamp.micros = timestamp
            .micros
            .saturating_add(rtt_correction_micros as u32);
        if timestamp.micros >= 1_000_000 {
            timestamp.unix_secs = timestamp.unix_secs.saturating_add(1);
            timestamp.micros -= 1_000_000;
        }

        info!(
            "NTP timestamp: {}.{:06} UTC (RTT correction: {} µs)",
            timestamp.unix_secs, timestamp.micros, rtt_correction_micros
        );
        Ok(timestamp)
    }
}
