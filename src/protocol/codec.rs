//! Protocol codec
//!
//! Encoding and decoding functions for the text protocol.
//!
//! ## Command Format
//! ```text
//! get <table> <key>
//! create <table> <keyColumnIndex> <col:KIND>...
//! insert <table> <col:value:KIND>...
//! update <table> <key> <col:value:KIND>...
//! delete <table> <key>
//! <raw text>                        (query / cmd)
//! ```
//! A value containing a space is wrapped in double quotes: `name:"Ada L":TEXT`.
//!
//! ## Reply Format
//! ```text
//! {"success":true,"detail":"ok","data":[{"id":"1","name":"a"}]}
//! ```
//! Replies are decoded by a narrow scanner, not a JSON parser: fixed field
//! markers, double-quoted string values only, no nesting, no escapes.

use std::borrow::Cow;

use super::{ColumnDef, Command, Record, Response, TypedValue};
use crate::error::{ClientError, Result};

const SUCCESS_MARKER: &str = "\"success\":";
const DETAIL_MARKER: &str = "\"detail\":";
const DATA_MARKER: &str = "\"data\":";

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command to its wire text
pub fn encode_command(command: &Command) -> String {
    let verb = command.command_type().verb();

    match command {
        Command::Query(text) | Command::Cmd(text) => text.clone(),
        Command::Get { table, key } | Command::Delete { table, key } => {
            format!("{} {} {}", verb, table, key)
        }
        Command::Create {
            table,
            key_column,
            columns,
        } => {
            let mut out = format!("{} {} {}", verb, table, key_column);
            for def in columns {
                out.push(' ');
                out.push_str(&def.column);
                out.push(':');
                out.push_str(def.kind.as_str());
            }
            out
        }
        Command::Insert { table, values } => {
            let mut out = format!("{} {}", verb, table);
            push_typed_values(&mut out, values);
            out
        }
        Command::Update { table, key, values } => {
            let mut out = format!("{} {} {}", verb, table, key);
            push_typed_values(&mut out, values);
            out
        }
    }
}

fn push_typed_values(out: &mut String, values: &[TypedValue]) {
    for value in values {
        out.push(' ');
        out.push_str(&value.column);
        out.push(':');
        out.push_str(&quote_value(&value.value));
        out.push(':');
        out.push_str(value.kind.as_str());
    }
}

/// Wrap `value` in double quotes if it contains a space
pub fn quote_value(value: &str) -> Cow<'_, str> {
    if value.contains(' ') {
        Cow::Owned(format!("\"{}\"", value))
    } else {
        Cow::Borrowed(value)
    }
}

// =============================================================================
// Command Decoding
// =============================================================================

/// Decode wire text back into a command
///
/// `query` and `cmd` share the raw form, so anything that is not one of the
/// structured verbs decodes to [`Command::Cmd`].
pub fn decode_command(text: &str) -> Result<Command> {
    let tokens = tokenize(text)?;
    let Some((verb, args)) = tokens.split_first() else {
        return Ok(Command::Cmd(text.to_string()));
    };

    match verb.to_ascii_lowercase().as_str() {
        "get" => {
            let (table, key) = table_and_key("get", args)?;
            expect_arity("get", args, 2)?;
            Ok(Command::Get { table, key })
        }
        "delete" => {
            let (table, key) = table_and_key("delete", args)?;
            expect_arity("delete", args, 2)?;
            Ok(Command::Delete { table, key })
        }
        "create" => {
            let table = required(args, 0, "create", "table")?.to_string();
            let key_column = required(args, 1, "create", "key column")?
                .parse::<usize>()
                .map_err(|_| malformed("create", "key column is not an index"))?;
            let columns = args[2..]
                .iter()
                .map(|token| parse_column_def(token))
                .collect::<Result<Vec<_>>>()?;
            Ok(Command::Create {
                table,
                key_column,
                columns,
            })
        }
        "insert" => {
            let table = required(args, 0, "insert", "table")?.to_string();
            let values = parse_tail(&args[1..])?;
            Ok(Command::Insert { table, values })
        }
        "update" => {
            let (table, key) = table_and_key("update", args)?;
            let values = parse_tail(&args[2..])?;
            Ok(Command::Update { table, key, values })
        }
        _ => Ok(Command::Cmd(text.to_string())),
    }
}

/// Parse a `col:value:KIND` token; the value may be double-quoted
pub fn parse_typed_value(token: &str) -> Result<TypedValue> {
    let (column, rest) = token
        .split_once(':')
        .ok_or_else(|| malformed_token(token, "expected col:value:KIND"))?;
    let (value, kind) = rest
        .rsplit_once(':')
        .ok_or_else(|| malformed_token(token, "expected col:value:KIND"))?;

    if column.is_empty() {
        return Err(malformed_token(token, "empty column name"));
    }
    TypedValue::parse(column, unquote(value), kind)
}

/// Parse a `col:KIND` column declaration
pub fn parse_column_def(token: &str) -> Result<ColumnDef> {
    let (column, kind) = token
        .split_once(':')
        .ok_or_else(|| malformed_token(token, "expected col:KIND"))?;

    if column.is_empty() {
        return Err(malformed_token(token, "empty column name"));
    }
    Ok(ColumnDef::new(column, kind.parse()?))
}

fn parse_tail(tokens: &[String]) -> Result<Vec<TypedValue>> {
    tokens.iter().map(|token| parse_typed_value(token)).collect()
}

fn table_and_key(verb: &str, args: &[String]) -> Result<(String, i64)> {
    let table = required(args, 0, verb, "table")?.to_string();
    let key = required(args, 1, verb, "key")?
        .parse::<i64>()
        .map_err(|_| malformed(verb, "key is not an integer"))?;
    Ok((table, key))
}

fn required<'a>(args: &'a [String], index: usize, verb: &str, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| malformed(verb, &format!("missing {}", what)))
}

fn expect_arity(verb: &str, args: &[String], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(malformed(
            verb,
            &format!("expected {} arguments, got {}", expected, args.len()),
        ));
    }
    Ok(())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Split on spaces outside double quotes. Quotes stay in the token.
fn tokenize(text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(ClientError::MalformedCommand(format!(
            "unterminated quote in '{}'",
            text
        )));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn malformed(verb: &str, reason: &str) -> ClientError {
    ClientError::MalformedCommand(format!("{}: {}", verb, reason))
}

fn malformed_token(token: &str, reason: &str) -> ClientError {
    ClientError::MalformedCommand(format!("'{}': {}", token, reason))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Render a response in the reply grammar
pub fn encode_response(response: &Response) -> String {
    let records: Vec<String> = response
        .data
        .iter()
        .map(|record| {
            let fields: Vec<String> = record
                .iter()
                .map(|(k, v)| format!("\"{}\":\"{}\"", k, v))
                .collect();
            format!("{{{}}}", fields.join(","))
        })
        .collect();

    format!(
        "{{\"success\":{},\"detail\":\"{}\",\"data\":[{}]}}",
        response.success,
        response.detail,
        records.join(",")
    )
}

/// Decode a reply
///
/// The object body runs from the first `{` to the last `}`. `"success":` is
/// required; `"detail":` and `"data":` are optional. Fields that do not match
/// the expected shape are skipped, never guessed at.
pub fn parse_response(text: &str) -> Result<Response> {
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => {
            return Err(ClientError::MalformedResponse(
                "no {...} object in reply".to_string(),
            ))
        }
    };

    let success_at = body
        .find(SUCCESS_MARKER)
        .ok_or_else(|| ClientError::MalformedResponse("missing \"success\" field".to_string()))?
        + SUCCESS_MARKER.len();

    // The body ends with '}', so a terminator always exists
    let success_end = body[success_at..]
        .find(|c: char| c == ',' || c == '}')
        .map_or(body.len(), |i| success_at + i);
    let success = &body[success_at..success_end] == "true";

    let detail = body
        .find(DETAIL_MARKER)
        .and_then(|at| quoted_after(body, at + DETAIL_MARKER.len()))
        .unwrap_or_default()
        .to_string();

    let data = body
        .find(DATA_MARKER)
        .map(|at| parse_records(&body[at + DATA_MARKER.len()..]))
        .unwrap_or_default();

    Ok(Response {
        success,
        detail,
        data,
    })
}

/// Text between the first pair of double quotes at or after `from`
fn quoted_after(s: &str, from: usize) -> Option<&str> {
    let open = from + s[from..].find('"')?;
    let close = open + 1 + s[open + 1..].find('"')?;
    Some(&s[open + 1..close])
}

/// Records of the `[...]` array that follows the data marker
fn parse_records(s: &str) -> Vec<Record> {
    let mut records = Vec::new();

    let Some(open) = s.find('[') else {
        return records;
    };
    let Some(close) = s[open..].find(']').map(|i| open + i) else {
        return records;
    };
    let mut rest = &s[open + 1..close];

    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        // Unterminated span: nothing more can be trusted
        let Some(end) = after.find('}') else {
            break;
        };
        records.push(parse_record(&after[..end]));
        rest = &after[end + 1..];
    }

    records
}

fn parse_record(object: &str) -> Record {
    let mut record = Record::new();
    for field in object.split(',') {
        if let Some((key, value)) = parse_field(field) {
            // First occurrence wins
            record.entry(key.to_string()).or_insert_with(|| value.to_string());
        }
    }
    record
}

/// `"key":"value"` with both sides double-quoted
fn parse_field(field: &str) -> Option<(&str, &str)> {
    let key_open = field.find('"')?;
    let key_close = key_open + 1 + field[key_open + 1..].find('"')?;
    let colon = key_close + field[key_close..].find(':')?;
    let value = quoted_after(field, colon + 1)?;
    Some((&field[key_open + 1..key_close], value))
}
