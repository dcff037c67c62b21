//! Content instance publishing
//!
//! One publish creates one content instance (`ty=4`) under the channel's
//! container: `POST <base>/<cse>/<ae>/<container>` with body
//! `{"m2m:cin":{"con":<value>}}`, the value written with two decimals.

use core::fmt::Write;

use hal_abstractions::{Connector, TransportError};
use heapless::String;

use crate::config::ServerConfig;
use crate::endpoint::{Endpoint, ResourcePath};
use crate::envelope::{RequestEnvelopeBuilder, RESOURCE_TYPE_CIN};
use crate::error::{ConfigError, HttpError};
use crate::http::{Method, STATUS_CREATED};
use crate::secure::SecureChannel;
use crate::sensor::SensorChannel;

/// Wrapper key of a content instance representation
pub const CONTENT_INSTANCE_KEY: &str = "m2m:cin";

/// Capacity of an encoded content instance body
pub const BODY_CAPACITY: usize = 64;

/// Encoded request body
pub type ContentBody = String<BODY_CAPACITY>;

/// Magnitudes from here on are written with the float formatter
const INTEGER_HUNDREDTHS_LIMIT: f64 = 1e15;

/// Write `value` with two decimals, halves rounded away from zero.
fn write_two_decimals<W: Write>(out: &mut W, value: f32) -> core::fmt::Result {
    let wide = f64::from(value);
    let abs = if wide < 0.0 { -wide } else { wide };
    let magnitude = abs * 100.0 + 0.5;
    if magnitude.is_nan() || magnitude >= INTEGER_HUNDREDTHS_LIMIT {
        return write!(out, "{:.2}", value);
    }
    // Truncation after the +0.5 bias is the rounding step
    let hundredths = magnitude as u64;
    let sign = if wide < 0.0 { "-" } else { "" };
    write!(out, "{}{}.{:02}", sign, hundredths / 100, hundredths % 100)
}

/// A content instance carrying one numeric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentInstance {
    pub con: f32,
}

impl ContentInstance {
    pub fn new(con: f32) -> Self {
        Self { con }
    }

    /// JSON representation, `con` rounded to two decimals.
    pub fn encode(&self) -> Result<ContentBody, HttpError> {
        let mut body = ContentBody::new();
        self.write_json(&mut body)
            .map_err(|_| HttpError::RequestTooLarge)?;
        Ok(body)
    }

    fn write_json<W: Write>(&self, out: &mut W) -> core::fmt::Result {
        write!(out, "{{\"{}\":{{\"con\":", CONTENT_INSTANCE_KEY)?;
        write_two_decimals(out, self.con)?;
        out.write_str("}}")
    }
}

/// Result of one publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    /// Server answered 201 Created
    Published,
    /// Server answered with another status
    Rejected(u16),
    /// The exchange did not complete
    TransportFailed(TransportError),
}

/// Creates content instances on the configured server
pub struct TelemetryClient<'a, C> {
    channel: SecureChannel<'a, C>,
    envelopes: RequestEnvelopeBuilder<'a>,
    server: ServerConfig,
}

impl<C: Connector> TelemetryClient<'static, C> {
    /// Build the client and its channel from `server`.
    pub fn from_config(
        connector: C,
        server: &ServerConfig,
        root_ca_pem: &str,
    ) -> Result<Self, ConfigError> {
        let endpoint = Endpoint::parse(server.base_url)?;
        let channel = SecureChannel::new(connector, endpoint, root_ca_pem);
        Ok(Self::new(channel, server))
    }
}

impl<'a, C: Connector> TelemetryClient<'a, C> {
    pub fn new(channel: SecureChannel<'a, C>, server: &ServerConfig) -> Self {
        Self {
            channel,
            envelopes: RequestEnvelopeBuilder::new(server.origin, server.release_version),
            server: *server,
        }
    }

    pub fn channel(&self) -> &SecureChannel<'a, C> {
        &self.channel
    }

    /// Path of the container that receives `channel`'s readings.
    pub fn container_path(&self, channel: SensorChannel) -> Result<ResourcePath, ConfigError> {
        self.channel.endpoint().resource_path(&[
            self.server.cse_base,
            self.server.application_entity,
            self.server.containers.for_channel(channel),
        ])
    }

    /// Create one content instance holding `value` under `channel`'s container.
    ///
    /// Never retries; every call that reaches the network consumes exactly
    /// one request id.
    pub async fn publish(&mut self, channel: SensorChannel, value: f32) -> PublishOutcome {
        let path = match self.container_path(channel) {
            Ok(path) => path,
            Err(e) => {
                error!("{}: bad resource path: {}", channel.name(), e);
                return PublishOutcome::TransportFailed(TransportError::BufferOverflow);
            }
        };
        if let Ok(url) = self.channel.endpoint().url(&path) {
            info!("{}: POST {}", channel.name(), url.as_str());
        }

        let body = match ContentInstance::new(value).encode() {
            Ok(body) => body,
            Err(e) => {
                error!("{}: body encoding failed: {}", channel.name(), e);
                return PublishOutcome::TransportFailed(e.into());
            }
        };

        let envelope = self.envelopes.next_envelope(true, RESOURCE_TYPE_CIN);
        match self
            .channel
            .send(Method::Post, &path, &envelope, &body)
            .await
        {
            Ok(response) if response.status == STATUS_CREATED => {
                info!(
                    "{}: HTTP {} {} (ri {})",
                    channel.name(),
                    response.status,
                    body.as_str(),
                    envelope.request_id
                );
                PublishOutcome::Published
            }
            Ok(response) => {
                warn!(
                    "{}: rejected with HTTP {} (ri {}): {}",
                    channel.name(),
                    response.status,
                    envelope.request_id,
                    response.body_text()
                );
                PublishOutcome::Rejected(response.status)
            }
            Err(e) => {
                error!(
                    "{}: transport failure (ri {}): {}",
                    channel.name(),
                    envelope.request_id,
                    e
                );
                PublishOutcome::TransportFailed(e)
            }
        }
    }
}
