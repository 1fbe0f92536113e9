//! tablink CLI Client
//!
//! Interactive shell and one-shot commands against a table server.

use std::io::{self, BufRead, Write};

use clap::{ArgAction, Parser, Subcommand};
use tablink::config::{DEFAULT_HOST, DEFAULT_PORT};
use tablink::protocol::{parse_column_def, parse_typed_value, Command, Response};
use tablink::{Config, Connection, Correlator};
use tracing_subscriber::{fmt, EnvFilter};

/// tablink CLI
#[derive(Parser, Debug)]
#[command(name = "tablink-cli")]
#[command(about = "Client for line-oriented table databases")]
#[command(version, disable_help_flag = true)]
struct Args {
    /// Server host
    #[arg(short = 'h', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port, numeric or a service name
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Run one command and exit; without one, start the interactive shell
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send raw query text
    Query {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Get a row by key
    Get { table: String, key: i64 },

    /// Declare a table from col:KIND columns
    Create {
        table: String,
        key_column: usize,
        columns: Vec<String>,
    },

    /// Insert a row of col:value:KIND values
    Insert { table: String, values: Vec<String> },

    /// Update a row by key with col:value:KIND values
    Update {
        table: String,
        key: i64,
        values: Vec<String>,
    },

    /// Delete a row by key
    Delete { table: String, key: i64 },
}

impl Commands {
    fn into_command(self) -> tablink::Result<Command> {
        let command = match self {
            Commands::Query { text } => Command::Query(text.join(" ")),
            Commands::Get { table, key } => Command::Get { table, key },
            Commands::Create {
                table,
                key_column,
                columns,
            } => Command::Create {
                table,
                key_column,
                columns: columns
                    .iter()
                    .map(|c| parse_column_def(c))
                    .collect::<tablink::Result<Vec<_>>>()?,
            },
            Commands::Insert { table, values } => Command::Insert {
                table,
                values: values
                    .iter()
                    .map(|v| parse_typed_value(v))
                    .collect::<tablink::Result<Vec<_>>>()?,
            },
            Commands::Update { table, key, values } => Command::Update {
                table,
                key,
                values: values
                    .iter()
                    .map(|v| parse_typed_value(v))
                    .collect::<tablink::Result<Vec<_>>>()?,
            },
            Commands::Delete { table, key } => Command::Delete { table, key },
        };
        Ok(command)
    }
}

fn main() {
    // Logs go to stderr so they stay out of the shell's output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tablink=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .host(args.host)
        .port(args.port)
        .build();

    let result = match args.command {
        Some(command) => run_once(config, command),
        None => run_shell(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Forward stdin lines verbatim and print whatever the server sends back
fn run_shell(config: Config) -> tablink::Result<()> {
    println!("[Config]: Connecting to {}", config.addr());

    let connection = Connection::with_config(config);
    connection.set_on_message(|chunk| {
        print!("\n[Server]: {}\n> ", chunk);
        let _ = io::stdout().flush();
    });
    connection.connect()?;

    let mut lines = io::stdin().lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line == "exit" {
            break;
        }
        connection.send(&line)?;
    }

    connection.disconnect();
    Ok(())
}

/// Execute a single command through the correlator
fn run_once(config: Config, command: Commands) -> tablink::Result<()> {
    let command = command.into_command()?;

    let db = Correlator::with_config(config);
    db.connect()?;
    let response = db.execute(&command);
    db.disconnect();

    print_response(&response?);
    Ok(())
}

fn print_response(response: &Response) {
    println!("success: {}", response.success);
    if !response.detail.is_empty() {
        println!("detail:  {}", response.detail);
    }
    for (i, record) in response.data.iter().enumerate() {
        let fields: Vec<String> = record.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("[{}] {}", i, fields.join(", "));
    }
}
