//! Transport capability interface
//!
//! The connection core only talks to these traits. [`TcpConnector`] is the
//! std-net adapter: it resolves `host:port`, walks the candidates in order and
//! hands back the first stream that accepts.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use super::resolver::resolve;
use crate::config::Config;
use crate::error::{ClientError, Result};

/// A connected, bidirectional byte stream.
///
/// All methods take `&self`: the receive thread blocks in [`Transport::recv`]
/// while callers write through [`Transport::send`] and `disconnect` calls
/// [`Transport::shutdown`] to unblock the reader.
pub trait Transport: Send + Sync {
    /// Write some prefix of `buf`, returning how many bytes were accepted
    fn send(&self, buf: &[u8]) -> io::Result<usize>;

    /// Read into `buf`. `Ok(0)` means the peer closed the stream.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Shut down both directions of the stream
    fn shutdown(&self) -> io::Result<()>;

    /// Remote address, when the transport has one
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Opens transports by name.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &Config) -> Result<Arc<dyn Transport>>;
}

impl<F> Connector for F
where
    F: Fn(&Config) -> Result<Arc<dyn Transport>> + Send + Sync,
{
    fn connect(&self, config: &Config) -> Result<Arc<dyn Transport>> {
        self(config)
    }
}

// =============================================================================
// TCP adapter
// =============================================================================

/// [`Transport`] over a `std::net::TcpStream`
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for TcpTransport {
    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        (&self.stream).write(buf)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buf)
    }

    fn shutdown(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // Peer already tore the stream down
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

/// Default [`Connector`]: resolves through the system resolver and connects
/// over TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, config: &Config) -> Result<Arc<dyn Transport>> {
        let addr = config.addr();
        let candidates = resolve(&config.host, &config.port)?;

        let mut last_error: Option<io::Error> = None;
        for candidate in candidates {
            match TcpStream::connect(candidate) {
                Ok(stream) => {
                    tracing::debug!("Connected to candidate {} for {}", candidate, addr);
                    configure(&stream, config)?;
                    return Ok(Arc::new(TcpTransport::new(stream)));
                }
                Err(e) => {
                    tracing::debug!("Candidate {} for {} refused: {}", candidate, addr, e);
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no reachable candidate".to_string());
        Err(ClientError::connect(addr, reason))
    }
}

/// Apply socket options from the config
fn configure(stream: &TcpStream, config: &Config) -> Result<()> {
    stream.set_nodelay(config.nodelay)?;
    if config.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
    }
    Ok(())
}
