//! pson - PSON command-line tool
//!
//! Encodes JSON to PSON, decodes PSON back to JSON, and prints annotated dumps.

use clap::{Parser, Subcommand};
use colored::Colorize;
use pson_codec::inspect::{self, Line};
use pson_codec::{ByteBuffer, CodecConfig, Mode, Pair, Value};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pson")]
#[command(about = "Encode, decode and inspect PSON messages")]
#[command(version)]
struct Cli {
    /// YAML configuration file (defaults to PSON_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON file holding an array of initial dictionary strings
    #[arg(short, long, global = true)]
    dictionary: Option<PathBuf>,

    /// Grow the dictionary as new strings are seen
    #[arg(short, long, global = true)]
    progressive: bool,

    /// Input file (stdin if omitted)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a stream of JSON values
    Encode {
        /// Write hex instead of raw bytes
        #[arg(long)]
        hex: bool,
    },

    /// Decode a stream of PSON messages to JSON
    Decode {
        /// Read hex instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// One JSON value per line instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Print an annotated listing of PSON messages
    Inspect {
        /// Read hex instead of raw bytes
        #[arg(long)]
        hex: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never mix with encoded output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let config = CodecConfig::from_file(path)?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => CodecConfig::load()?,
    };
    if let Some(path) = &cli.dictionary {
        config.dictionary_file = Some(path.clone());
    }
    if cli.progressive {
        config.mode = Mode::Progressive;
    }

    let mut pair = Pair::from_config(&config)?;
    tracing::debug!(
        mode = %config.mode,
        entries = pair.encoder().dictionary().len(),
        "Codec ready"
    );

    let input = read_input(cli.input.as_ref())?;
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => {
            colored::control::set_override(false);
            Box::new(fs::File::create(path)?)
        }
        None => Box::new(io::stdout().lock()),
    };

    match cli.command {
        Commands::Encode { hex } => {
            let text = String::from_utf8(input)?;
            let mut buf = ByteBuffer::new();
            let mut count = 0;
            for json in serde_json::Deserializer::from_str(&text).into_iter::<serde_json::Value>()
            {
                pair.encode_into(&Value::try_from(json?)?, &mut buf)?;
                count += 1;
            }
            tracing::info!(
                "Encoded {} message(s): {} -> {} bytes",
                count,
                text.trim_end().len(),
                buf.len()
            );
            if hex {
                writeln!(out, "{}", hex::encode(buf.as_slice()))?;
            } else {
                out.write_all(buf.as_slice())?;
            }
        }
        Commands::Decode { hex, compact } => {
            let bytes = if hex { decode_hex(&input)? } else { input };
            let mut buf = ByteBuffer::from(bytes);
            while buf.remaining() > 0 {
                let json = serde_json::Value::from(pair.decode_from(&mut buf)?);
                if compact {
                    writeln!(out, "{}", serde_json::to_string(&json)?)?;
                } else {
                    writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
                }
            }
        }
        Commands::Inspect { hex } => {
            let bytes = if hex { decode_hex(&input)? } else { input };
            let dictionary = config.initial_dictionary()?;
            match inspect::dump(&bytes, &dictionary, config.max_depth) {
                Ok(lines) => {
                    for line in &lines {
                        writeln!(out, "{}", render(line))?;
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path),
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn decode_hex(input: &[u8]) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    hex::decode(digits)
}

fn render(line: &Line) -> String {
    let name = if line.key {
        format!("key {}", line.name()).yellow()
    } else {
        line.name().cyan()
    };
    format!(
        "{}  {:indent$}{} {}",
        format!("{:06x}", line.offset).dimmed(),
        "",
        name,
        line.detail,
        indent = line.depth * 2
    )
    .trim_end()
    .to_string()
}
