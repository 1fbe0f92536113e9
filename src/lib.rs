//! # tablink
//!
//! A client for line-oriented table databases with:
//! - Asynchronous chunk delivery from a background receive thread
//! - Synchronous call-and-reply on top of it through a single-slot mailbox
//! - Typed command encoding (`get`/`create`/`insert`/`update`/`delete`)
//! - A narrow decoder for the server's JSON-like replies
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Correlator                            │
//! │        encode command → send → wait on mailbox → parse       │
//! └──────────────┬──────────────────────────────▲───────────────┘
//!                │ send(text)                   │ on_message(chunk)
//! ┌──────────────▼──────────────────────────────┴───────────────┐
//! │                        Connection                            │
//! │           caller thread writes │ receive thread reads        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                ┌──────▼──────┐
//!                │  Transport  │
//!                │ (TCP / mock)│
//!                └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tablink::Correlator;
//!
//! fn main() -> tablink::Result<()> {
//!     let db = Correlator::new("127.0.0.1", "65535");
//!     db.connect()?;
//!
//!     db.insert("users", &[("id", "5", "INT"), ("name", "Ada L", "TEXT")])?;
//!     let reply = db.get("users", 5)?;
//!     for record in &reply.data {
//!         println!("{:?}", record);
//!     }
//!
//!     db.disconnect();
//!     Ok(())
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod protocol;
pub mod correlator;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ClientError, Result};
pub use config::Config;
pub use network::Connection;
pub use correlator::Correlator;
pub use protocol::{Record, Response};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tablink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
