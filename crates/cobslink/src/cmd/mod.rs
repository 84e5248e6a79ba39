use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod echo;
pub mod encode;
pub mod request;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a payload and print the wire bytes.
    Encode(EncodeArgs),
    /// Decode captured wire bytes back into payloads.
    Decode(DecodeArgs),
    /// Send one request and print the response.
    Request(RequestArgs),
    /// Serve requests by echoing each payload back.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Request(args) => request::run(args, format),
        Command::Echo(args) => echo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Exactly one payload source.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// UTF-8 string payload.
    #[arg(long)]
    pub data: Option<String>,
    /// Hex-encoded payload (e.g. 0001ff).
    #[arg(long)]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(text) = &self.hex {
            return parse_hex(text);
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

/// Decode hex, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let trimmed = text.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex wire bytes: one or more stuffed frames, each optionally
    /// followed by the 00 delimiter.
    #[arg(required = true, num_args = 1..)]
    pub frames: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Peer address: tcp:HOST:PORT, unix:PATH or a socket path.
    pub addr: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Write/read cycles before giving up.
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Pause between attempts (e.g. 10ms, 1s).
    #[arg(long, value_name = "DURATION")]
    pub retry_delay: Option<String>,
    /// Per-attempt response deadline (e.g. 500ms, 2s).
    #[arg(long, value_name = "DURATION")]
    pub read_timeout: Option<String>,
    /// JSON channel config (attempts, retry_delay_ms, read_timeout_ms);
    /// flags override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to listen on: tcp:HOST:PORT, unix:PATH or a socket path.
    pub addr: String,
    /// Exit after answering N requests.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
