//! Network link and secure transport collaborators

use core::future::Future;

use embedded_io_async::{Read, Write};

/// Network link bring-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Physical or radio link is not up
    NotAssociated,
    /// Link is up but no address has been assigned yet
    AddressPending,
    /// Network controller reported a fault
    HardwareFault,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotAssociated => write!(f, "Link not associated"),
            Self::AddressPending => write!(f, "Address not yet assigned"),
            Self::HardwareFault => write!(f, "Network hardware fault"),
        }
    }
}

impl core::error::Error for LinkError {}

/// Secure transport errors
///
/// Every way a secure round trip can fail without producing an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No usable trust anchor; nothing was sent
    NoTrustAnchor,
    /// DNS resolution failed
    DnsError,
    /// TCP connect failed
    ConnectFailed,
    /// TLS handshake failed
    HandshakeFailed,
    /// Server certificate did not validate against the trust anchor
    CertificateRejected,
    /// Read or write on an established connection failed
    Io,
    /// Peer closed the connection before a complete response arrived
    ConnectionClosed,
    /// Request or response did not fit the channel buffers
    BufferOverflow,
    /// Response bytes are not valid HTTP/1.1
    MalformedResponse,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoTrustAnchor => write!(f, "No trust anchor loaded"),
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::ConnectFailed => write!(f, "Connection failed"),
            Self::HandshakeFailed => write!(f, "TLS handshake failed"),
            Self::CertificateRejected => write!(f, "Server certificate rejected"),
            Self::Io => write!(f, "I/O error"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::BufferOverflow => write!(f, "Buffer overflow"),
            Self::MalformedResponse => write!(f, "Malformed response"),
        }
    }
}

impl core::error::Error for TransportError {}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::Io | Self::ConnectionClosed => embedded_io_async::ErrorKind::BrokenPipe,
            Self::ConnectFailed => embedded_io_async::ErrorKind::ConnectionRefused,
            Self::MalformedResponse => embedded_io_async::ErrorKind::InvalidData,
            Self::BufferOverflow => embedded_io_async::ErrorKind::OutOfMemory,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}

/// Network link (Wi-Fi station, Ethernet with DHCP, ...)
pub trait NetworkLink {
    /// Try once to bring the link up with the board's configured credentials.
    ///
    /// Returns `Ok(())` once the link can carry traffic.
    fn connect(&mut self) -> impl Future<Output = Result<(), LinkError>>;
}

/// Opens authenticated, encrypted byte streams to a server.
///
/// Implementations must validate the server certificate chain against
/// `trust_anchor` (DER) and fail with [`TransportError::CertificateRejected`]
/// rather than fall back to an unauthenticated session.
pub trait Connector {
    /// An established secure stream
    type Connection<'a>: Read + Write
    where
        Self: 'a;

    /// Resolve `host`, connect to `port` and complete the TLS handshake.
    fn connect<'a>(
        &'a mut self,
        host: &'a str,
        port: u16,
        trust_anchor: &'a [u8],
    ) -> impl Future<Output = Result<Self::Connection<'a>, TransportError>>;
}
