//! Correlator Module
//!
//! Turns the connection's chunk callback into call-and-reply.
//!
//! ## Responsibilities
//! - Encode typed commands into the text protocol
//! - Pair each command with the next reply chunk through a single-slot mailbox
//! - Decode the reply into a [`Response`]
//!
//! ## Single Outstanding Request
//! There is one mailbox slot and no request queue. A reply is paired with the
//! most recent command only when exactly one request is in flight. Callers
//! sharing a `Correlator` across threads must serialize their calls
//! themselves (an external `Mutex<Correlator>` works).

mod mailbox;

use std::sync::Arc;
use std::time::Duration;

pub use mailbox::Mailbox;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::network::Connection;
use crate::protocol::{encode_command, parse_response, Command, Response};

/// Synchronous request/response client over a [`Connection`]
pub struct Correlator {
    connection: Connection,
    mailbox: Arc<Mailbox>,
}

impl Correlator {
    /// Create an unconnected correlator for `host:port`
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self::from_connection(Connection::new(host, port))
    }

    pub fn with_config(config: Config) -> Self {
        Self::from_connection(Connection::with_config(config))
    }

    /// Take over `connection`, replacing its delivery callback
    pub fn from_connection(connection: Connection) -> Self {
        let mailbox = Arc::new(Mailbox::new());
        let sink = Arc::clone(&mailbox);
        connection.set_on_message(move |chunk| sink.deliver(chunk));

        Self {
            connection,
            mailbox,
        }
    }

    pub fn connect(&self) -> Result<()> {
        self.connection.connect()
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_active()
    }

    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Send raw query text
    pub fn query(&self, text: &str) -> Result<Response> {
        self.execute(&Command::Query(text.to_string()))
    }

    /// Send a raw command
    pub fn cmd(&self, text: &str) -> Result<Response> {
        self.execute(&Command::Cmd(text.to_string()))
    }

    pub fn get(&self, table: &str, key: i64) -> Result<Response> {
        self.execute(&Command::get(table, key))
    }

    /// Declare `table` with `(column, kind)` pairs
    pub fn create(&self, table: &str, key_column: usize, columns: &[(&str, &str)]) -> Result<Response> {
        self.execute(&Command::create(table, key_column, columns)?)
    }

    /// Insert a row of `(column, value, kind)` triples
    pub fn insert(&self, table: &str, values: &[(&str, &str, &str)]) -> Result<Response> {
        self.execute(&Command::insert(table, values)?)
    }

    pub fn update(&self, table: &str, key: i64, values: &[(&str, &str, &str)]) -> Result<Response> {
        self.execute(&Command::update(table, key, values)?)
    }

    pub fn delete(&self, table: &str, key: i64) -> Result<Response> {
        self.execute(&Command::delete(table, key))
    }

    /// Encode and send `command`, then wait for its reply
    pub fn execute(&self, command: &Command) -> Result<Response> {
        let text = encode_command(command);
        tracing::debug!("Executing {} command", command.command_type().verb());
        self.send_command(&text)
    }

    // =========================================================================
    // Correlation
    // =========================================================================

    /// Send `text` and block until the next reply chunk arrives
    ///
    /// There is no timeout: if the server never answers, or closes the
    /// connection, this call never returns. Use
    /// [`Correlator::send_command_timeout`] for a bounded wait.
    pub fn send_command(&self, text: &str) -> Result<Response> {
        self.mailbox.clear();
        self.connection.send(text)?;

        let reply = self.mailbox.take();
        tracing::trace!("Reply: {:?}", reply);
        parse_response(&reply)
    }

    /// Send `text` and wait at most `timeout` for the reply
    ///
    /// A reply that arrives after the timeout stays in the mailbox until the
    /// next request clears it.
    pub fn send_command_timeout(&self, text: &str, timeout: Duration) -> Result<Response> {
        self.mailbox.clear();
        self.connection.send(text)?;

        match self.mailbox.take_timeout(timeout) {
            Some(reply) => {
                tracing::trace!("Reply: {:?}", reply);
                parse_response(&reply)
            }
            None => {
                tracing::warn!("No reply from {} within {:?}", self.connection.config().addr(), timeout);
                Err(ClientError::Timeout(timeout))
            }
        }
    }
}
