//! Authenticated request/response channel to the resource-tree server
//!
//! The channel owns the trust anchor and the connector. Each `send` opens a
//! fresh connection through the connector, writes one request and reads one
//! response (the request asks the server to close afterwards).

use embedded_io_async::{Read, Write};
use hal_abstractions::{Connector, TransportError};

use crate::endpoint::Endpoint;
use crate::envelope::RequestEnvelope;
use crate::error::HttpError;
use crate::http::{encode_request, parse_response, Method, Response, ResponseHead};
use crate::trust::TrustAnchor;

/// Size of the response receive buffer
pub const RESPONSE_CAPACITY: usize = 1024;

/// HTTPS channel bound to one server
pub struct SecureChannel<'a, C> {
    connector: C,
    endpoint: Endpoint<'a>,
    anchor: Option<TrustAnchor>,
    response_buf: [u8; RESPONSE_CAPACITY],
}

impl<'a, C: Connector> SecureChannel<'a, C> {
    /// Create the channel, loading the trust anchor from `root_ca_pem`.
    ///
    /// A certificate that fails to load is reported here and leaves the
    /// channel without an anchor: every later `send` fails with
    /// [`TransportError::NoTrustAnchor`].
    pub fn new(connector: C, endpoint: Endpoint<'a>, root_ca_pem: &str) -> Self {
        let anchor = match TrustAnchor::from_pem(root_ca_pem) {
            Ok(anchor) => {
                info!("Trust anchor loaded ({} bytes DER)", anchor.der().len());
                Some(anchor)
            }
            Err(e) => {
                error!("Trust anchor load failed: {}; uploads disabled", e);
                None
            }
        };
        Self {
            connector,
            endpoint,
            anchor,
            response_buf: [0; RESPONSE_CAPACITY],
        }
    }

    pub fn has_trust_anchor(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn endpoint(&self) -> &Endpoint<'a> {
        &self.endpoint
    }

    /// Perform one request and return the server's response.
    ///
    /// The response body borrows the channel's receive buffer and is valid
    /// until the next `send`.
    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        envelope: &RequestEnvelope<'_>,
        body: &str,
    ) -> Result<Response<'_>, TransportError> {
        let head = self.exchange(method, path, envelope, body).await?;
        Ok(Response {
            status: head.status,
            body: &self.response_buf[head.body_start..head.body_end],
        })
    }

    async fn exchange(
        &mut self,
        method: Method,
        path: &str,
        envelope: &RequestEnvelope<'_>,
        body: &str,
    ) -> Result<ResponseHead, TransportError> {
        let Some(anchor) = self.anchor.as_ref() else {
            return Err(TransportError::NoTrustAnchor);
        };
        let request = encode_request(method, &self.endpoint, path, envelope, body)?;

        debug!(
            "Connecting to {}:{}",
            self.endpoint.host(),
            self.endpoint.port()
        );
        let mut conn = self
            .connector
            .connect(self.endpoint.host(), self.endpoint.port(), anchor.der())
            .await?;

        conn.write_all(request.as_bytes())
            .await
            .map_err(|_| TransportError::Io)?;
        conn.flush().await.map_err(|_| TransportError::Io)?;

        let mut filled = 0;
        loop {
            let (n, eof) = match conn.read(&mut self.response_buf[filled..]).await {
                Ok(n) => (n, n == 0),
                // Some stacks report the peer's close as an error
                Err(_) => match parse_response(&self.response_buf[..filled], true) {
                    Ok(Some(head)) => return Ok(head),
                    _ => return Err(TransportError::Io),
                },
            };
            filled += n;

            if let Some(head) = parse_response(&self.response_buf[..filled], eof)? {
                return Ok(head);
            }
            if eof {
                return Err(TransportError::ConnectionClosed);
            }
            if filled == self.response_buf.len() {
                return Err(HttpError::ResponseTooLarge.into());
            }
        }
    }
}
