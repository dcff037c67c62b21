#![deny(unsafe_code)]
#![deny(warnings)]
//! TLS 1.3 connector using embedded-tls
//!
//! Opens one HTTPS connection at a time over the static buffers in
//! `tls_buffers`. The server chain is checked against the configured root
//! CA by the webpki verifier; there is no unauthenticated fallback.
//!
//! # Memory Usage
//!
//! - TLS read buffer: 16.25 KB, TLS write buffer: 4 KB
//! - TCP socket buffers: 4 KB (2 KB RX + 2 KB TX)

use defmt::{debug, error, info, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_tls::webpki::CertVerifier;
use embedded_tls::{
    Aes128GcmSha256, Certificate, CryptoProvider, TlsConfig, TlsConnection, TlsContext,
    TlsVerifier,
};
use hal_abstractions::{Connector, TransportError};

use crate::time::RtcClock;
use crate::tls_buffers::TlsBuffers;

use super::socket::AsyncTcpSocket;

/// Largest server certificate the verifier will parse
const CERT_SIZE: usize = 4096;

/// Crypto provider pairing the hardware RNG with the webpki verifier
struct VerifyingProvider<'r, RNG> {
    rng: &'r mut RNG,
    verifier: CertVerifier<Aes128GcmSha256, RtcClock, CERT_SIZE>,
}

impl<'r, RNG> VerifyingProvider<'r, RNG> {
    fn new(rng: &'r mut RNG) -> Self {
        Self {
            rng,
            verifier: CertVerifier::new(),
        }
    }
}

impl<RNG> CryptoProvider for VerifyingProvider<'_, RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut *self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, embedded_tls::TlsError> {
        Ok(&mut self.verifier)
    }
}

fn handshake_error(e: embedded_tls::TlsError) -> TransportError {
    match e {
        embedded_tls::TlsError::InvalidCertificate | embedded_tls::TlsError::InvalidSignature => {
            TransportError::CertificateRejected
        }
        _ => TransportError::HandshakeFailed,
    }
}

/// HTTPS connector over the W5500 stack
pub struct TlsConnector<RNG> {
    stack: Stack<'static>,
    rng: RNG,
    buffers: &'static mut TlsBuffers,
    tcp_timeout: Duration,
}

impl<RNG> TlsConnector<RNG> {
    pub fn new(
        stack: Stack<'static>,
        rng: RNG,
        buffers: &'static mut TlsBuffers,
        tcp_timeout_ms: u64,
    ) -> Self {
        Self {
            stack,
            rng,
            buffers,
            tcp_timeout: Duration::from_millis(tcp_timeout_ms),
        }
    }

    async fn resolve(&self, host: &str) -> Result<embassy_net::IpAddress, TransportError> {
        self.stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                error!("DNS query for {} failed: {:?}", host, Debug2Format(&e));
                TransportError::DnsError
            })?
            .first()
            .copied()
            .ok_or_else(|| {
                error!("DNS returned no results for {}", host);
                TransportError::DnsError
            })
    }
}

impl<RNG> Connector for TlsConnector<RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type Connection<'a>
        = TlsConnection<'a, AsyncTcpSocket<'a>, Aes128GcmSha256>
    where
        Self: 'a;

    async fn connect<'a>(
        &'a mut self,
        host: &'a str,
        port: u16,
        trust_anchor: &'a [u8],
    ) -> Result<Self::Connection<'a>, TransportError> {
        let server_ip = self.resolve(host).await?;
        let endpoint = IpEndpoint::new(server_ip, port);
        debug!("Resolved {} to {}", host, Debug2Format(&endpoint));

        let TlsBuffers {
            tcp_rx,
            tcp_tx,
            tls_read,
            tls_write,
        } = &mut *self.buffers;

        let mut socket = AsyncTcpSocket::new(self.stack, tcp_rx, tcp_tx, self.tcp_timeout);
        socket.connect(endpoint).await.map_err(|e| {
            error!("TCP connect to {} failed: {}", Debug2Format(&endpoint), e);
            TransportError::from(e)
        })?;

        let config = TlsConfig::new()
            .with_server_name(host)
            .with_ca(Certificate::X509(trust_anchor));
        let mut connection = TlsConnection::new(socket, tls_read, tls_write);

        let provider = VerifyingProvider::new(&mut self.rng);
        connection
            .open(TlsContext::new(&config, provider))
            .await
            .map_err(|e| {
                error!("TLS handshake with {} failed: {:?}", host, Debug2Format(&e));
                handshake_error(e)
            })?;

        info!("TLS 1.3 session established with {}:{}", host, port);
        Ok(connection)
    }
}
