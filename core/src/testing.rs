//! Test doubles for the collaborator traits
//!
//! Time is simulated: delays advance a shared counter instantly, so every
//! future in this crate completes on first poll under `block_on`.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorType, Read, Write};
use hal_abstractions::{
    AnalogInput, Connector, LinkError, Monotonic, NetworkLink, Sensor, TimeSource,
    TransportError, WallClock,
};

/// Shared simulated monotonic clock; delaying on it advances it
#[derive(Clone, Default)]
pub struct SimClock {
    now_ns: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.set(self.now_ns.get() + ms * 1_000_000);
    }
}

impl Monotonic for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

impl DelayNs for SimClock {
    async fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(us) * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance_ms(u64::from(ms));
    }
}

/// Wall clock that reads zero until `valid_from_ms` on the simulated clock
pub struct SimWallClock {
    clock: SimClock,
    valid_from_ms: Option<u64>,
    synced_secs: u64,
}

impl SimWallClock {
    pub fn never_valid(clock: SimClock) -> Self {
        Self {
            clock,
            valid_from_ms: None,
            synced_secs: 0,
        }
    }

    pub fn valid_from(clock: SimClock, valid_from_ms: u64, synced_secs: u64) -> Self {
        Self {
            clock,
            valid_from_ms: Some(valid_from_ms),
            synced_secs,
        }
    }
}

impl WallClock for SimWallClock {
    fn unix_secs(&self) -> u64 {
        match self.valid_from_ms {
            Some(from) if self.clock.now_ms() >= from => {
                self.synced_secs + (self.clock.now_ms() - from) / 1000
            }
            _ => 0,
        }
    }
}

/// Time source that only records requests
#[derive(Default)]
pub struct RecordingTimeSource {
    pub requests: Vec<&'static [&'static str]>,
}

impl TimeSource for RecordingTimeSource {
    fn request_sync(&mut self, servers: &'static [&'static str]) {
        self.requests.push(servers);
    }
}

/// Link that fails a fixed number of times before coming up
pub struct FlakyLink {
    failures: u32,
    pub attempts: u32,
}

impl FlakyLink {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            attempts: 0,
        }
    }
}

impl NetworkLink for FlakyLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        self.attempts += 1;
        if self.attempts <= self.failures {
            Err(LinkError::NotAssociated)
        } else {
            Ok(())
        }
    }
}

/// Sensor returning a fixed value
pub struct FixedSensor {
    value: f32,
    reads: u32,
}

impl FixedSensor {
    pub fn new(value: f32) -> Self {
        Self { value, reads: 0 }
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl Sensor for FixedSensor {
    async fn read(&mut self) -> f32 {
        self.reads += 1;
        self.value
    }
}

/// ADC channel returning a fixed raw value
pub struct FixedAdc {
    raw: u16,
}

impl FixedAdc {
    pub fn new(raw: u16) -> Self {
        Self { raw }
    }
}

impl AnalogInput for FixedAdc {
    async fn read_raw(&mut self) -> u16 {
        self.raw
    }
}

/// What the scripted server does with a request
pub enum Reply {
    /// Respond with a status and a `Content-Length` delimited body
    Status(u16, &'static str),
    /// Respond with raw bytes, then close
    Raw(&'static [u8]),
    /// Accept the request, then fail the read
    ReadFails,
}

/// Everything the scripted server observed
#[derive(Clone, Default)]
pub struct RequestLog {
    connects: Rc<Cell<u32>>,
    anchors: Rc<RefCell<Vec<usize>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl RequestLog {
    pub fn connects(&self) -> u32 {
        self.connects.get()
    }

    /// DER length of the trust anchor passed to each connect
    pub fn anchor_lens(&self) -> Vec<usize> {
        self.anchors.borrow().clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| String::from(request_path(r)))
            .collect()
    }

    pub fn request_ids(&self) -> Vec<u32> {
        self.requests()
            .iter()
            .filter_map(|r| header(r, "X-M2M-RI"))
            .filter_map(|v| v.parse().ok())
            .collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| String::from(request_body(r)))
            .collect()
    }
}

/// Request target of an encoded request
pub fn request_path(request: &str) -> &str {
    request.split(' ').nth(1).unwrap_or("")
}

/// Body of an encoded request
pub fn request_body(request: &str) -> &str {
    request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}

/// Value of header `name` in an encoded request
pub fn header<'r>(request: &'r str, name: &str) -> Option<&'r str> {
    let head = request.split_once("\r\n\r\n").map(|(h, _)| h)?;
    head.split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}

type Responder = Box<dyn Fn(&str) -> Reply>;

/// Connector backed by a scripted in-memory server
pub struct ScriptedConnector {
    responder: Responder,
    connect_error: Option<TransportError>,
    log: RequestLog,
}

impl ScriptedConnector {
    pub fn new(responder: impl Fn(&str) -> Reply + 'static) -> (Self, RequestLog) {
        let log = RequestLog::default();
        let connector = Self {
            responder: Box::new(responder),
            connect_error: None,
            log: log.clone(),
        };
        (connector, log)
    }

    /// Server that creates every resource
    pub fn always_created() -> (Self, RequestLog) {
        Self::new(|_| Reply::Status(201, "{\"m2m:cin\":{\"ri\":\"cin1\"}}"))
    }

    pub fn failing_connect(error: TransportError) -> (Self, RequestLog) {
        let (mut connector, log) = Self::always_created();
        connector.connect_error = Some(error);
        (connector, log)
    }
}

impl Connector for ScriptedConnector {
    type Connection<'a>
        = ScriptedConnection<'a>
    where
        Self: 'a;

    async fn connect<'a>(
        &'a mut self,
        _host: &'a str,
        _port: u16,
        trust_anchor: &'a [u8],
    ) -> Result<ScriptedConnection<'a>, TransportError> {
        self.log.connects.set(self.log.connects.get() + 1);
        self.log.anchors.borrow_mut().push(trust_anchor.len());
        if let Some(e) = self.connect_error {
            return Err(e);
        }
        Ok(ScriptedConnection {
            responder: &self.responder,
            log: self.log.clone(),
            request: Vec::new(),
            response: None,
            pos: 0,
        })
    }
}

/// One scripted exchange
pub struct ScriptedConnection<'a> {
    responder: &'a Responder,
    log: RequestLog,
    request: Vec<u8>,
    response: Option<Result<Vec<u8>, TransportError>>,
    pos: usize,
}

/// Responses are served in small pieces to exercise incremental parsing
const READ_CHUNK: usize = 16;

impl ScriptedConnection<'_> {
    fn respond(&mut self) -> Result<Vec<u8>, TransportError> {
        let request = String::from_utf8_lossy(&self.request).into_owned();
        let reply = (self.responder)(&request);
        self.log.requests.borrow_mut().push(request);
        match reply {
            Reply::Status(code, body) => Ok(format!(
                "HTTP/1.1 {} Scripted\r\nContent-Length: {}\r\n\r\n{}",
                code,
                body.len(),
                body
            )
            .into_bytes()),
            Reply::Raw(bytes) => Ok(bytes.to_vec()),
            Reply::ReadFails => Err(TransportError::Io),
        }
    }
}

impl ErrorType for ScriptedConnection<'_> {
    type Error = TransportError;
}

impl Read for ScriptedConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.response.is_none() {
            self.response = Some(self.respond());
        }
        let bytes = match &self.response {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => return Err(*e),
            None => return Err(TransportError::Io),
        };
        let n = (bytes.len() - self.pos).min(buf.len()).min(READ_CHUNK);
        buf[..n].copy_from_slice(&bytes[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for ScriptedConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.request.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Smallest PEM the trust anchor loader accepts: SEQUENCE { INTEGER 1 }
pub const TEST_ROOT_CA: &str = "-----BEGIN CERTIFICATE-----\nMAMCAQE=\n-----END CERTIFICATE-----\n";

/// The certificate text shipped before a real root CA is provisioned
pub const PLACEHOLDER_ROOT_CA: &str =
    "-----BEGIN CERTIFICATE-----\nLocal Certification by Mobius4 Server\n-----END CERTIFICATE-----\n";
