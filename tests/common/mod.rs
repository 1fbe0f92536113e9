//! Shared test fixtures
//!
//! - `MockServer`: a loopback TCP server driven by a closure
//! - `ChannelTransport`: an in-memory transport backed by crossbeam channels

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tablink::network::{Connector, Transport};
use tablink::Config;

/// How long tests wait for something that should happen promptly
pub const WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// Loopback TCP server
// =============================================================================

/// Accepts a single client on 127.0.0.1 and hands the stream to a handler
pub struct MockServer {
    port: u16,
    received: Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Reply to every chunk with whatever `responder` returns
    pub fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + 'static,
    {
        Self::with_handler(move |mut stream, received| {
            let mut buf = [0u8; 4096];
            loop {
                let n = match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                let reply = responder(&text);
                let _ = received.send(text);
                if let Some(reply) = reply {
                    if stream.write_all(reply.as_bytes()).is_err() {
                        break;
                    }
                }
            }
        })
    }

    /// Run `handler` on the accepted stream; it reports commands on the sender
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: FnOnce(TcpStream, Sender<String>) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = channel::unbounded();

        let handle = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                handler(stream, tx);
            }
        });

        Self {
            port,
            received: rx,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> String {
        self.port.to_string()
    }

    pub fn config(&self) -> Config {
        Config::builder().host("127.0.0.1").port(self.port()).build()
    }

    /// Next chunk the server read from the client
    pub fn next_command(&self) -> String {
        self.received.recv_timeout(WAIT).expect("server saw no command")
    }

    /// Wait for the handler to finish
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

/// A port nothing is listening on
pub fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port.to_string()
}

/// Poll `condition` until it holds or `WAIT` elapses
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// =============================================================================
// In-memory transport
// =============================================================================

/// What the peer pushes toward the client
enum Inbound {
    Data(Vec<u8>),
    Fail(io::ErrorKind),
}

/// Client half of an in-memory stream
pub struct ChannelTransport {
    incoming: Receiver<Inbound>,
    outgoing: Sender<Vec<u8>>,
    /// Bytes of the last inbound message that did not fit the read buffer
    pending: Mutex<Vec<u8>>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    shut_down: AtomicBool,
    /// Cap on bytes accepted per `send`, to force short writes
    max_write: Option<usize>,
    /// Fail every `send` with this error
    send_error: Option<io::ErrorKind>,
}

/// Server half of an in-memory stream
pub struct ChannelPeer {
    to_client: Option<Sender<Inbound>>,
    from_client: Receiver<Vec<u8>>,
}

impl ChannelTransport {
    pub fn pair() -> (Arc<ChannelTransport>, ChannelPeer) {
        Self::build(None, None)
    }

    /// Transport that accepts at most `max` bytes per send
    pub fn with_short_writes(max: usize) -> (Arc<ChannelTransport>, ChannelPeer) {
        Self::build(Some(max), None)
    }

    /// Transport whose sends always fail with `kind`
    pub fn failing(kind: io::ErrorKind) -> (Arc<ChannelTransport>, ChannelPeer) {
        Self::build(None, Some(kind))
    }

    fn build(
        max_write: Option<usize>,
        send_error: Option<io::ErrorKind>,
    ) -> (Arc<ChannelTransport>, ChannelPeer) {
        let (to_client, incoming) = channel::unbounded();
        let (outgoing, from_client) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);

        let transport = Arc::new(ChannelTransport {
            incoming,
            outgoing,
            pending: Mutex::new(Vec::new()),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            shut_down: AtomicBool::new(false),
            max_write,
            send_error,
        });
        let peer = ChannelPeer {
            to_client: Some(to_client),
            from_client,
        };
        (transport, peer)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn fill(&self, data: Vec<u8>, buf: &mut [u8]) -> usize {
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        *self.pending.lock() = data[n..].to_vec();
        n
    }
}

impl Transport for ChannelTransport {
    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        if let Some(kind) = self.send_error {
            return Err(io::Error::new(kind, "injected send failure"));
        }
        if self.is_shut_down() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "shut down"));
        }
        let n = self.max_write.map_or(buf.len(), |max| max.min(buf.len()));
        self.outgoing
            .send(buf[..n].to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))?;
        Ok(n)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let pending = std::mem::take(&mut *self.pending.lock());
        if !pending.is_empty() {
            return Ok(self.fill(pending, buf));
        }

        channel::select! {
            recv(self.incoming) -> msg => match msg {
                Ok(Inbound::Data(data)) => Ok(self.fill(data, buf)),
                Ok(Inbound::Fail(kind)) => Err(io::Error::new(kind, "injected receive failure")),
                // Peer dropped its sender: orderly close
                Err(_) => Ok(0),
            },
            recv(self.shutdown_rx) -> _ => {
                Err(io::Error::new(io::ErrorKind::ConnectionAborted, "shut down"))
            }
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        self.shutdown_tx.lock().take();
        Ok(())
    }
}

impl ChannelPeer {
    /// Push bytes to the client
    pub fn send(&self, text: &str) {
        if let Some(tx) = &self.to_client {
            tx.send(Inbound::Data(text.as_bytes().to_vec())).unwrap();
        }
    }

    /// Make the client's next read fail
    pub fn fail(&self, kind: io::ErrorKind) {
        if let Some(tx) = &self.to_client {
            tx.send(Inbound::Fail(kind)).unwrap();
        }
    }

    /// Orderly close from the server side
    pub fn close(&mut self) {
        self.to_client.take();
    }

    /// Everything the client has written so far, concatenated
    pub fn drain(&self) -> String {
        let mut out = Vec::new();
        while let Ok(chunk) = self.from_client.try_recv() {
            out.extend(chunk);
        }
        String::from_utf8(out).unwrap()
    }

    /// Next write from the client, waiting up to `WAIT`
    pub fn next_write(&self) -> String {
        let chunk = self.from_client.recv_timeout(WAIT).expect("client wrote nothing");
        String::from_utf8(chunk).unwrap()
    }
}

/// Connector that hands out `transport` once per connect
pub fn connector_for(transport: Arc<ChannelTransport>) -> impl Connector {
    move |_: &Config| -> tablink::Result<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = transport.clone();
        Ok(transport)
    }
}

/// Config for in-memory connections; the address is only used in logs
pub fn memory_config() -> Config {
    Config::builder().host("memory").port("0").build()
}
