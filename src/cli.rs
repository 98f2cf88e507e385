//! Command-line front end: reads one payload, runs it through a `qrcode` stage, writes the image.

use crate::config::RawConfig;
use crate::error::{QrError, Result};
use crate::{logger, processor, Message, Pipeline};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "qrcode-processor")]
#[command(about = "Render a payload as a QR code image (PNG or SVG)")]
pub struct Args {
    /// Path to a TOML processor configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read the payload from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Write the image to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the output format (png or svg)
    #[arg(long)]
    pub format: Option<String>,

    /// Override the error correction level (low, medium, quartile, high)
    #[arg(long)]
    pub ecl: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    /// The configuration file, if any, with `--format` and `--ecl` applied on top.
    /// Nothing is validated yet.
    pub fn raw_config(&self) -> Result<RawConfig> {
        let mut raw = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                RawConfig::from_file(path)?
            }
            None => RawConfig::default(),
        };
        if let Some(format) = &self.format {
            raw.format = Some(format.clone());
        }
        if let Some(ecl) = &self.ecl {
            raw.ecl = Some(ecl.clone());
        }
        Ok(raw)
    }

    fn read_message(&self) -> Result<Message> {
        match &self.input {
            Some(path) => {
                let file = fs::File::open(path).map_err(|e| QrError::MessageRead {
                    reason: format!("{}: {}", path.display(), e),
                })?;
                Message::from_reader(file)
            }
            None => Message::from_reader(io::stdin().lock()),
        }
    }
}

/// Runs one payload end to end and returns the number of image bytes written.
pub fn run(args: &Args) -> Result<usize> {
    let pipeline = Pipeline::builder()
        .with_stage("qrcode", processor::build, args.raw_config()?.to_toml_value()?)
        .build()?;

    let result = args.read_message().and_then(|message| {
        let mut written = 0;
        for msg in pipeline.process(message)? {
            let bytes = msg.into_bytes()?;
            match &args.output {
                Some(path) => fs::write(path, &bytes)?,
                None => io::stdout().lock().write_all(&bytes)?,
            }
            written += bytes.len();
        }
        Ok(written)
    });

    pipeline.shutdown()?;
    result
}

/// 2 for failures tied to the payload, 1 for everything else.
pub fn exit_status(err: &QrError) -> u8 {
    if err.is_per_message() {
        2
    } else {
        1
    }
}

pub fn main() -> ExitCode {
    let args = Args::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::debug!("CLI args: {:?}", args);

    match run(&args) {
        Ok(written) => {
            tracing::info!(bytes = written, "QR code written");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}
