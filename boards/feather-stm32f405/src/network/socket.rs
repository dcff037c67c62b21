#![deny(unsafe_code)]
#![deny(warnings)]
//! Async TCP socket wrapper for embedded-tls integration
//!
//! Wraps `embassy_net::tcp::TcpSocket` in the `embedded-io-async` traits
//! that `embedded-tls` reads and writes records through.

use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_io_async::{ErrorType, Read, Write};

use super::error::NetworkError;

/// Async TCP socket wrapper implementing embedded-io-async traits
pub struct AsyncTcpSocket<'a> {
    socket: TcpSocket<'a>,
}

impl<'a> AsyncTcpSocket<'a> {
    /// Create a socket over caller-provided buffers.
    ///
    /// Reads and writes that stall for longer than `timeout` abort the
    /// connection, so a silent peer cannot hang the upload loop.
    pub fn new(
        stack: Stack<'a>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        timeout: Duration,
    ) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(timeout));
        Self { socket }
    }

    /// Connect to a remote endpoint
    pub async fn connect(&mut self, endpoint: IpEndpoint) -> Result<(), NetworkError> {
        self.socket
            .connect(endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

impl ErrorType for AsyncTcpSocket<'_> {
    type Error = NetworkError;
}

impl Read for AsyncTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket
            .read(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

impl Write for AsyncTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket
            .write(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket
            .flush()
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}
