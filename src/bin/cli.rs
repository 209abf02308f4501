//! tnt CLI Client
//!
//! Command-line interface for issuing single requests.
//!
//! Numeric arguments are sent as 4-byte (or, if larger, 8-byte) integer
//! fields; anything else is sent as raw text.

use std::process::ExitCode;
use std::time::Duration;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use tnt::{
    pack_u32, pack_u64, Call, Connection, Delete, Field, Insert, Keys, Memcache, Options, Select, Tuple,
};
use tracing_subscriber::{fmt, EnvFilter};

/// tnt CLI
#[derive(Parser, Debug)]
#[command(name = "tnt-cli")]
#[command(about = "CLI for IPROTO tuple stores")]
#[command(version)]
struct Args {
    /// Server address (host:port[/default_space])
    #[arg(short, long, default_value = "127.0.0.1:2001")]
    server: String,

    /// Request timeout in milliseconds
    #[arg(short, long, default_value = "1000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Select records by single-field keys
    Select {
        /// Target space
        #[arg(long)]
        space: Option<u32>,

        /// Index number
        #[arg(long, default_value = "0")]
        index: u32,

        /// Maximum records (0 = unbounded)
        #[arg(long, default_value = "0")]
        limit: u32,

        /// Keys to look up
        keys: Vec<String>,
    },

    /// Insert a tuple
    Insert {
        #[arg(long)]
        space: Option<u32>,

        /// Tuple fields
        fields: Vec<String>,
    },

    /// Delete a record by primary key
    Delete {
        #[arg(long)]
        space: Option<u32>,

        /// Key fields
        key: Vec<String>,
    },

    /// Call a stored procedure
    Call {
        /// Procedure name
        name: String,

        /// Arguments
        args: Vec<String>,
    },

    /// Memcache-style get
    Get {
        key: String,
    },

    /// Memcache-style set
    Set {
        key: String,
        value: String,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tnt=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let options = Options::builder()
        .query_timeout(Duration::from_millis(args.timeout_ms))
        .build();

    let conn = match Connection::connect(&args.server, options) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Select { space, index, limit, keys } => conn
            .execute(Select {
                space: space.map(Into::into),
                index,
                limit,
                keys: Keys::Values(keys.iter().map(|k| parse_field(k)).collect()),
                ..Select::default()
            })
            .map(print_tuples),
        Commands::Insert { space, fields } => conn
            .execute(Insert {
                space: space.map(Into::into),
                tuple: parse_tuple(&fields),
                return_tuple: true,
            })
            .map(print_tuples),
        Commands::Delete { space, key } => conn
            .execute(Delete {
                space: space.map(Into::into),
                key: parse_tuple(&key),
                return_tuple: true,
            })
            .map(print_tuples),
        Commands::Call { name, args } => conn
            .execute(Call::new(name, parse_tuple(&args)))
            .map(print_tuples),
        Commands::Get { key } => Memcache::new(conn).get(&key).map(|value| match value {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        }),
        Commands::Set { key, value } => Memcache::new(conn)
            .set(&key, value.as_bytes(), 0)
            .map(|()| println!("OK")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_field(arg: &str) -> Field {
    if let Ok(value) = arg.parse::<u32>() {
        pack_u32(value)
    } else if let Ok(value) = arg.parse::<u64>() {
        pack_u64(value)
    } else {
        Bytes::copy_from_slice(arg.as_bytes())
    }
}

fn parse_tuple(args: &[String]) -> Tuple {
    args.iter().map(|arg| parse_field(arg)).collect()
}

fn print_tuples(tuples: Vec<Tuple>) {
    for tuple in &tuples {
        let fields: Vec<String> = tuple.iter().map(|field| format_field(field)).collect();
        println!("[{}]", fields.join(", "));
    }
    println!("({} tuples)", tuples.len());
}

fn format_field(field: &[u8]) -> String {
    match field.len() {
        4 => u32::from_le_bytes([field[0], field[1], field[2], field[3]]).to_string(),
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(field);
            u64::from_le_bytes(raw).to_string()
        }
        _ => format!("{:?}", String::from_utf8_lossy(field)),
    }
}
