//! Trust anchor (root CA certificate) loading
//!
//! The anchor is decoded from PEM once at startup into a bounded DER buffer
//! and never modified afterwards.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use heapless::Vec;

use crate::error::TrustAnchorError;

/// Largest accepted DER certificate
pub const MAX_CERT_DER: usize = 2048;

/// Largest base64 body for [`MAX_CERT_DER`] bytes
const MAX_CERT_BASE64: usize = MAX_CERT_DER.div_ceil(3) * 4;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// DER tag of an ASN.1 SEQUENCE, the outer type of an X.509 certificate
const DER_SEQUENCE: u8 = 0x30;

/// Root certificate used to authenticate the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    der: Vec<u8, MAX_CERT_DER>,
}

impl TrustAnchor {
    /// Decode the first certificate of a PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, TrustAnchorError> {
        let start = pem
            .find(PEM_BEGIN)
            .ok_or(TrustAnchorError::MissingBeginMarker)?
            + PEM_BEGIN.len();
        let len = pem[start..]
            .find(PEM_END)
            .ok_or(TrustAnchorError::MissingEndMarker)?;

        let mut encoded: Vec<u8, MAX_CERT_BASE64> = Vec::new();
        for byte in pem[start..start + len].bytes() {
            if byte.is_ascii_whitespace() {
                continue;
            }
            encoded
                .push(byte)
                .map_err(|_| TrustAnchorError::TooLarge)?;
        }
        if encoded.is_empty() {
            return Err(TrustAnchorError::Empty);
        }

        let mut der: Vec<u8, MAX_CERT_DER> = Vec::new();
        der.resize(MAX_CERT_DER, 0)
            .map_err(|_| TrustAnchorError::TooLarge)?;
        let decoded = STANDARD
            .decode_slice(&encoded, &mut der)
            .map_err(|e| match e {
                base64::DecodeSliceError::OutputSliceTooSmall => TrustAnchorError::TooLarge,
                base64::DecodeSliceError::DecodeError(_) => TrustAnchorError::InvalidBase64,
            })?;
        der.truncate(decoded);

        if der.first() != Some(&DER_SEQUENCE) {
            return Err(TrustAnchorError::NotDer);
        }
        Ok(Self { der })
    }

    /// The certificate in DER form, as handed to the TLS verifier.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}
