//! Static buffers for the HTTPS connector
//!
//! One request is in flight at a time, so a single set of TCP and TLS
//! buffers is reused by every connection. They live in `.bss` and are handed
//! out exactly once, at startup.
//!
//! # Buffer Sizing
//!
//! **TLS read buffer (16.25 KB)**: a full TLS 1.3 record (16384 bytes of
//! plaintext) plus record header, AEAD tag and content type byte.
//!
//! **TLS write buffer (4 KB)**: outgoing records carry one encoded request,
//! which is far smaller.
//!
//! **TCP buffers (2 KB each)**: the W5500 has its own 2 KB socket buffers.

use static_cell::ConstStaticCell;

const TLS_READ_BUF_SIZE: usize = 16 * 1024 + 256;
const TLS_WRITE_BUF_SIZE: usize = 4 * 1024;
const TCP_BUF_SIZE: usize = 2 * 1024;

pub struct TlsBuffers {
    pub tcp_rx: [u8; TCP_BUF_SIZE],
    pub tcp_tx: [u8; TCP_BUF_SIZE],
    pub tls_read: [u8; TLS_READ_BUF_SIZE],
    pub tls_write: [u8; TLS_WRITE_BUF_SIZE],
}

impl TlsBuffers {
    const fn new() -> Self {
        Self {
            tcp_rx: [0; TCP_BUF_SIZE],
            tcp_tx: [0; TCP_BUF_SIZE],
            tls_read: [0; TLS_READ_BUF_SIZE],
            tls_write: [0; TLS_WRITE_BUF_SIZE],
        }
    }
}

static BUFFERS: ConstStaticCell<TlsBuffers> = ConstStaticCell::new(TlsBuffers::new());

/// Take the buffers. Panics if called twice.
pub fn take() -> &'static mut TlsBuffers {
    BUFFERS.take()
}
