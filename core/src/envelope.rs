//! oneM2M request envelopes
//!
//! Every request carries a correlation id (`X-M2M-RI`) drawn from a single
//! process-lifetime counter, the originator (`X-M2M-Origin`) and the release
//! version (`X-M2M-RVI`). Write operations also carry the resource type of the
//! created resource in the `Content-Type` (`application/json; ty=N`).

use core::sync::atomic::{AtomicU32, Ordering};

/// oneM2M resource type of a content instance
pub const RESOURCE_TYPE_CIN: u8 = 4;

/// First correlation id handed out after boot
pub const FIRST_REQUEST_ID: u32 = 10_000;

/// Media type for both `Accept` and `Content-Type`
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Protocol headers for one outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestEnvelope<'a> {
    /// `X-M2M-RI`
    pub request_id: u32,
    /// `X-M2M-Origin`
    pub origin: &'a str,
    /// `X-M2M-RVI`
    pub release_version: &'a str,
    /// `ty` parameter of the `Content-Type`; `None` for reads
    pub resource_type: Option<u8>,
}

/// Allocates request envelopes with strictly increasing correlation ids
///
/// The counter is the only mutable state; it advances exactly once per
/// envelope, whether or not the request later succeeds. It lives as long as
/// the builder and is never reset.
#[derive(Debug)]
pub struct RequestEnvelopeBuilder<'a> {
    next_id: AtomicU32,
    origin: &'a str,
    release_version: &'a str,
}

impl<'a> RequestEnvelopeBuilder<'a> {
    pub fn new(origin: &'a str, release_version: &'a str) -> Self {
        Self::starting_at(FIRST_REQUEST_ID, origin, release_version)
    }

    pub fn starting_at(first_id: u32, origin: &'a str, release_version: &'a str) -> Self {
        Self {
            next_id: AtomicU32::new(first_id),
            origin,
            release_version,
        }
    }

    /// Allocate the envelope for the next request.
    ///
    /// Takes `&self`: the increment is a single atomic read-modify-write, so
    /// ids stay unique and ordered if the builder is ever shared.
    pub fn next_envelope(&self, is_write: bool, resource_type: u8) -> RequestEnvelope<'a> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        RequestEnvelope {
            request_id,
            origin: self.origin,
            release_version: self.release_version,
            resource_type: is_write.then_some(resource_type),
        }
    }
}
