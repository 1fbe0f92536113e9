//! Protocol Module
//!
//! Defines the text protocol spoken with the server.
//!
//! ## Commands
//! Space-separated tokens, one command per write, no delimiter:
//! - `get <table> <key>`
//! - `create <table> <keyColumnIndex> <col:KIND>...`
//! - `insert <table> <col:value:KIND>...`
//! - `update <table> <key> <col:value:KIND>...`
//! - `delete <table> <key>`
//! - raw query/command text, forwarded verbatim
//!
//! ### Column Kinds
//! - INT, TEXT, DOUBLE, DATE
//!
//! ## Replies
//! One JSON-like object per reply with a required `success` flag and optional
//! `detail` and `data` fields. See [`parse_response`] for what is accepted.

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, encode_command, encode_response, parse_column_def, parse_response,
    parse_typed_value, quote_value,
};
pub use command::{ColumnDef, ColumnKind, Command, CommandType, TypedValue};
pub use response::{Record, Response};
