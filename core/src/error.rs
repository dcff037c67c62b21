//! Error types for configuration, trust anchor loading, time sync and HTTP framing

pub use hal_abstractions::{LinkError, TransportError};

/// Startup configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Base URL uses plain `http://`
    InsecureScheme,
    /// Base URL has no recognised scheme
    UnsupportedScheme,
    /// Base URL has an empty host
    MissingHost,
    /// Base URL port is not a number in 1..=65535
    InvalidPort,
    /// A resource name is empty or contains `/`
    InvalidResourceName,
    /// Upload period is zero
    InvalidPeriod,
    /// Time-sync poll interval is outside 1..=1000 ms
    InvalidPollInterval,
    /// Resource path does not fit the path buffer
    PathTooLong,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InsecureScheme => write!(f, "Base URL must use https"),
            Self::UnsupportedScheme => write!(f, "Unsupported URL scheme"),
            Self::MissingHost => write!(f, "Missing host"),
            Self::InvalidPort => write!(f, "Invalid port"),
            Self::InvalidResourceName => write!(f, "Invalid resource name"),
            Self::InvalidPeriod => write!(f, "Upload period must be non-zero"),
            Self::InvalidPollInterval => write!(f, "Poll interval must be 1..=1000 ms"),
            Self::PathTooLong => write!(f, "Resource path too long"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Trust anchor (root CA) loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrustAnchorError {
    /// No `-----BEGIN CERTIFICATE-----` line
    MissingBeginMarker,
    /// No `-----END CERTIFICATE-----` line after the begin marker
    MissingEndMarker,
    /// Certificate body is empty
    Empty,
    /// Certificate body is not valid base64
    InvalidBase64,
    /// Decoded certificate exceeds the DER buffer
    TooLarge,
    /// Decoded bytes are not a DER SEQUENCE
    NotDer,
}

impl core::fmt::Display for TrustAnchorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingBeginMarker => write!(f, "Missing PEM begin marker"),
            Self::MissingEndMarker => write!(f, "Missing PEM end marker"),
            Self::Empty => write!(f, "Empty certificate"),
            Self::InvalidBase64 => write!(f, "Invalid base64 in certificate"),
            Self::TooLarge => write!(f, "Certificate too large"),
            Self::NotDer => write!(f, "Certificate is not DER encoded"),
        }
    }
}

impl core::error::Error for TrustAnchorError {}

/// Time synchronization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSyncError {
    /// Wall clock never passed the validity threshold
    TimedOut {
        /// Milliseconds spent polling
        waited_ms: u64,
    },
}

impl core::fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TimedOut { waited_ms } => write!(f, "Time sync timed out after {} ms", waited_ms),
        }
    }
}

impl core::error::Error for TimeSyncError {}

/// HTTP/1.1 framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Encoded request does not fit the request buffer
    RequestTooLarge,
    /// Response does not fit the response buffer
    ResponseTooLarge,
    /// Status line is not `HTTP/1.x NNN ...`
    MalformedStatusLine,
    /// A header line has no `:` or an unparsable `Content-Length`
    MalformedHeader,
    /// Connection ended before the headers or the declared body arrived
    Incomplete,
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RequestTooLarge => write!(f, "Request too large"),
            Self::ResponseTooLarge => write!(f, "Response too large"),
            Self::MalformedStatusLine => write!(f, "Malformed status line"),
            Self::MalformedHeader => write!(f, "Malformed header"),
            Self::Incomplete => write!(f, "Incomplete response"),
        }
    }
}

impl core::error::Error for HttpError {}

impl From<HttpError> for TransportError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RequestTooLarge | HttpError::ResponseTooLarge => {
                TransportError::BufferOverflow
            }
            HttpError::Incomplete => TransportError::ConnectionClosed,
            HttpError::MalformedStatusLine | HttpError::MalformedHeader => {
                TransportError::MalformedResponse
            }
        }
    }
}
