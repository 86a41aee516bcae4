//! `hex2bin`: turns `build/bootloader.hex` into `build/bootloader.bin`.
//!
//! Run from the bootloader project root after the firmware build. Exits with
//! status 1, and writes nothing, when the image starts with the legacy
//! bootloader marker `0x8a`.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use bootloader_hex2bin::convert::{DEFAULT_INPUT, DEFAULT_OUTPUT};
use bootloader_hex2bin::{convert_file, ConvertError, ConvertOptions};
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert the bootloader Intel HEX image to a raw binary", long_about = None)]
struct Cli {
    /// Intel HEX image produced by the bootloader build.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_INPUT)]
    input: PathBuf,
    /// Raw binary to write.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Fill byte for addresses the image leaves unset (decimal or 0x-prefixed hex).
    #[arg(long, value_name = "BYTE", default_value = "0xFF", value_parser = parse_byte)]
    padding: u8,
    /// Increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        report(&err);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbose)?;
    debug!(?cli, "starting");

    let options = ConvertOptions {
        padding: cli.padding,
    };
    convert_file(&cli.input, &cli.output, &options)?;
    Ok(())
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")?;
    Ok(())
}

/// The start-byte refusal goes to stdout in the wording the build scripts
/// grep for; every other failure goes to stderr with its cause chain.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ConvertError>() {
        Some(ConvertError::Validation(rule)) => println!("ERROR: {rule}"),
        _ => eprintln!("Error: {err:#}"),
    }
}

fn parse_byte(text: &str) -> Result<u8, String> {
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => text.parse::<u8>(),
    };
    parsed.map_err(|e| format!("`{text}` is not a byte value: {e}"))
}
