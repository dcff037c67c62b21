//! Minimal HTTP/1.1 framing for the oneM2M binding
//!
//! Requests are encoded into a fixed buffer with `Connection: close`, so one
//! connection carries exactly one exchange. Responses are parsed
//! incrementally: a response is complete once its headers and the declared
//! `Content-Length` bytes have arrived, or at end of stream when no length is
//! declared.

use core::fmt::Write;

use heapless::String;

use crate::endpoint::{Endpoint, HTTPS_PORT};
use crate::envelope::{RequestEnvelope, MEDIA_TYPE_JSON};
use crate::error::HttpError;

/// Capacity of an encoded request (head + body)
pub const REQUEST_CAPACITY: usize = 512;

/// HTTP status for a created resource
pub const STATUS_CREATED: u16 = 201;

/// Encoded request bytes
pub type EncodedRequest = String<REQUEST_CAPACITY>;

/// Request method
///
/// oneM2M maps create onto `POST` and retrieve onto `GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Encode one request for `path` on `endpoint`.
pub fn encode_request(
    method: Method,
    endpoint: &Endpoint<'_>,
    path: &str,
    envelope: &RequestEnvelope<'_>,
    body: &str,
) -> Result<EncodedRequest, HttpError> {
    let mut out = EncodedRequest::new();
    write_request(&mut out, method, endpoint, path, envelope, body)
        .map_err(|_| HttpError::RequestTooLarge)?;
    Ok(out)
}

fn write_request(
    out: &mut EncodedRequest,
    method: Method,
    endpoint: &Endpoint<'_>,
    path: &str,
    envelope: &RequestEnvelope<'_>,
    body: &str,
) -> core::fmt::Result {
    write!(out, "{} {} HTTP/1.1\r\n", method.as_str(), path)?;
    if endpoint.port() == HTTPS_PORT {
        write!(out, "Host: {}\r\n", endpoint.host())?;
    } else {
        write!(out, "Host: {}:{}\r\n", endpoint.host(), endpoint.port())?;
    }
    write!(out, "Accept: {}\r\n", MEDIA_TYPE_JSON)?;
    if let Some(ty) = envelope.resource_type {
        write!(out, "Content-Type: {}; ty={}\r\n", MEDIA_TYPE_JSON, ty)?;
    }
    write!(out, "X-M2M-Origin: {}\r\n", envelope.origin)?;
    write!(out, "X-M2M-RI: {}\r\n", envelope.request_id)?;
    write!(out, "X-M2M-RVI: {}\r\n", envelope.release_version)?;
    if method == Method::Post || !body.is_empty() {
        write!(out, "Content-Length: {}\r\n", body.len())?;
    }
    out.write_str("Connection: close\r\n\r\n")?;
    out.write_str(body)
}

/// Location of a complete response inside the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub body_start: usize,
    pub body_end: usize,
}

/// A received response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: u16,
    pub body: &'a [u8],
}

impl<'a> Response<'a> {
    /// Body as text for diagnostics.
    pub fn body_text(&self) -> &'a str {
        core::str::from_utf8(self.body).unwrap_or("<non-utf8 body>")
    }
}

/// Try to parse a response from the bytes received so far.
///
/// Returns `Ok(None)` when more bytes are needed. `eof` marks that the peer
/// has closed the stream, which completes a body without `Content-Length`.
pub fn parse_response(buf: &[u8], eof: bool) -> Result<Option<ResponseHead>, HttpError> {
    let Some(head_len) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return if eof {
            Err(HttpError::Incomplete)
        } else {
            Ok(None)
        };
    };

    let head = core::str::from_utf8(&buf[..head_len]).map_err(|_| HttpError::MalformedHeader)?;
    let mut lines = head.split("\r\n");
    let status = parse_status_line(lines.next().unwrap_or(""))?;

    let mut content_length = None;
    for line in lines {
        let (name, value) = line.split_once(':').ok_or(HttpError::MalformedHeader)?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            let len = value
                .trim()
                .parse::<usize>()
                .map_err(|_| HttpError::MalformedHeader)?;
            content_length = Some(len);
        }
    }

    let body_start = head_len + 4;
    if matches!(status, 100..=199 | 204 | 304) {
        return Ok(Some(ResponseHead {
            status,
            body_start,
            body_end: body_start,
        }));
    }

    let available = buf.len() - body_start;
    match content_length {
        Some(len) if available >= len => Ok(Some(ResponseHead {
            status,
            body_start,
            body_end: body_start + len,
        })),
        Some(_) if eof => Err(HttpError::Incomplete),
        Some(_) => Ok(None),
        None if eof => Ok(Some(ResponseHead {
            status,
            body_start,
            body_end: buf.len(),
        })),
        None => Ok(None),
    }
}

fn parse_status_line(line: &str) -> Result<u16, HttpError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::MalformedStatusLine);
    }
    let code = parts.next().unwrap_or("");
    if code.len() != 3 {
        return Err(HttpError::MalformedStatusLine);
    }
    code.parse::<u16>()
        .ok()
        .filter(|c| (100..=599).contains(c))
        .ok_or(HttpError::MalformedStatusLine)
}
