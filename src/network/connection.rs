//! Client connection
//!
//! Owns one transport, one background receive thread and one delivery
//! callback. Bytes go out through [`Connection::send`]; whatever the server
//! writes back is handed, chunk by chunk, to the callback installed with
//! [`Connection::set_on_message`]. Nothing here interprets content.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::atomic::AtomicCell;
use parking_lot::{Mutex, RwLock};

use super::transport::{Connector, TcpConnector, Transport};
use crate::config::Config;
use crate::error::{ClientError, Result};

/// Size of the receive buffer. A reply must fit in one read of this size.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Delivery callback, invoked on the receive thread with each raw chunk
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, `connect` not yet called
    NotStarted,

    /// Socket open, receive thread running
    Active,

    /// Disconnected, or the peer closed / the read failed
    Stopped,
}

/// An asynchronous client connection
///
/// ## Threading
/// - Every method takes `&self`, so a connection can be shared between a
///   thread that sends and the callback that prints replies.
/// - The receive thread is the only other thread; it owns a clone of the
///   transport and exits on orderly close, read error or `disconnect`.
/// - The callback runs on the receive thread. It must not block on a reply
///   from the same connection.
pub struct Connection {
    /// Target address and socket options
    config: Config,

    /// Opens the transport on `connect`
    connector: Box<dyn Connector>,

    /// Open transport; `None` before `connect` and after `disconnect`
    transport: Mutex<Option<Arc<dyn Transport>>>,

    /// Shared with the receive thread
    state: Arc<AtomicCell<RunState>>,

    /// Receive thread handle, joined on `disconnect`
    receiver: Mutex<Option<JoinHandle<()>>>,

    /// Delivery callback, shared with the receive thread
    on_message: Arc<RwLock<Option<MessageHandler>>>,

    /// Keeps concurrent `send` calls from interleaving their bytes
    write_lock: Mutex<()>,
}

impl Connection {
    /// Create an unconnected TCP connection to `host:port`
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        let config = Config::builder().host(host).port(port).build();
        Self::with_config(config)
    }

    /// Create an unconnected TCP connection from a config
    pub fn with_config(config: Config) -> Self {
        Self::with_connector(config, TcpConnector)
    }

    /// Create an unconnected connection that opens its transport through
    /// `connector`
    pub fn with_connector(config: Config, connector: impl Connector + 'static) -> Self {
        Self {
            config,
            connector: Box::new(connector),
            transport: Mutex::new(None),
            state: Arc::new(AtomicCell::new(RunState::NotStarted)),
            receiver: Mutex::new(None),
            on_message: Arc::new(RwLock::new(None)),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the transport and start the receive thread
    ///
    /// A connection is single-use: once it has been active, build a new one
    /// to reconnect.
    pub fn connect(&self) -> Result<()> {
        // Held for the whole call so two racing connects cannot both open
        let mut slot = self.transport.lock();

        if self.state.load() != RunState::NotStarted {
            return Err(ClientError::connect(
                self.config.addr(),
                "connection already used; create a new one to reconnect",
            ));
        }
        // A config that can never resolve fails the same way a lookup does
        self.config.validate().map_err(|e| match e {
            ClientError::Config(reason) => ClientError::connect(self.config.addr(), reason),
            other => other,
        })?;

        let transport = self.connector.connect(&self.config)?;
        let peer = transport
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| self.config.addr());

        self.state.store(RunState::Active);

        let receiver = ReceiveLoop {
            transport: Arc::clone(&transport),
            state: Arc::clone(&self.state),
            on_message: Arc::clone(&self.on_message),
            peer: peer.clone(),
        };

        let handle = thread::Builder::new()
            .name("tablink-recv".to_string())
            .spawn(move || receiver.run());

        match handle {
            Ok(handle) => {
                *slot = Some(transport);
                *self.receiver.lock() = Some(handle);
                tracing::info!("Connected to {}", peer);
                Ok(())
            }
            Err(e) => {
                self.state.store(RunState::Stopped);
                let _ = transport.shutdown();
                Err(ClientError::Io(e))
            }
        }
    }

    /// Close the connection and wait for the receive thread to exit
    ///
    /// Safe to call any number of times. Also runs on drop.
    pub fn disconnect(&self) {
        if let Some(transport) = self.transport.lock().take() {
            self.state.store(RunState::Stopped);
            if let Err(e) = transport.shutdown() {
                tracing::debug!("Shutdown of {} failed: {}", self.config.addr(), e);
            }
            tracing::info!("Disconnected from {}", self.config.addr());
        }

        let handle = self.receiver.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                // Called from the callback; the loop exits once it returns
                tracing::debug!("disconnect invoked on the receive thread; not joining");
            } else if handle.join().is_err() {
                tracing::warn!("Receive thread for {} panicked", self.config.addr());
            }
        }
    }

    /// Write all of `message` to the server
    pub fn send(&self, message: impl AsRef<[u8]>) -> Result<()> {
        let transport = match (self.state.load(), self.transport.lock().clone()) {
            (RunState::Active, Some(transport)) => transport,
            _ => return Err(ClientError::NotConnected),
        };

        let bytes = message.as_ref();
        let _guard = self.write_lock.lock();
        write_all(transport.as_ref(), bytes)?;

        tracing::trace!("Sent {} bytes to {}", bytes.len(), self.config.addr());
        Ok(())
    }

    /// Install the delivery callback, replacing any previous one
    ///
    /// Takes effect from the next chunk delivered.
    pub fn set_on_message<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.on_message.write() = Some(Arc::new(handler));
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state.load()
    }

    /// True while the socket is open and the receive thread is reading
    pub fn is_active(&self) -> bool {
        self.state.load() == RunState::Active
    }

    /// True while a receive thread exists and has not finished
    pub fn is_receiving(&self) -> bool {
        self.receiver
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// The configuration this connection was built with
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Write every byte of `bytes`, looping over short writes
fn write_all(transport: &dyn Transport, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        match transport.send(bytes) {
            Ok(0) => {
                return Err(ClientError::Send(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "transport accepted zero bytes",
                )))
            }
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ClientError::Send(e)),
        }
    }
    Ok(())
}

// =============================================================================
// Receive Thread
// =============================================================================

/// State moved onto the receive thread
struct ReceiveLoop {
    transport: Arc<dyn Transport>,
    state: Arc<AtomicCell<RunState>>,
    on_message: Arc<RwLock<Option<MessageHandler>>>,
    peer: String,
}

/// Marks the connection stopped however the loop exits, panics included
struct StopOnExit(Arc<AtomicCell<RunState>>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.store(RunState::Stopped);
    }
}

impl ReceiveLoop {
    fn run(self) {
        let _stop = StopOnExit(Arc::clone(&self.state));
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        while self.state.load() == RunState::Active {
            match self.transport.recv(&mut buf) {
                Ok(0) => {
                    tracing::info!("Server {} closed connection", self.peer);
                    return;
                }
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]);
                    tracing::debug!("Received {} bytes from {}", n, self.peer);
                    tracing::trace!("Chunk from {}: {:?}", self.peer, chunk);

                    if self.state.load() != RunState::Active {
                        return;
                    }
                    // Clone out so the callback may replace itself
                    let handler = self.on_message.read().clone();
                    if let Some(handler) = handler {
                        handler(&chunk);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if self.state.load() == RunState::Active {
                        tracing::warn!("Receive error from {}: {}", self.peer, e);
                    } else {
                        tracing::debug!("Receive from {} ended by disconnect: {}", self.peer, e);
                    }
                    return;
                }
            }
        }
    }
}
