use anyhow::{Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use gbl_image::{Image, ImageReport, ParseOptions};

const EXIT_INVALID: u8 = 1;
const EXIT_CORRUPT: u8 = 2;

#[derive(Parser)]
#[command(name = "gbl-inspect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decode and validate a GBL firmware-update image")]
struct Cli {
    /// Image file to inspect
    file: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Reject unknown tags instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Refuse images larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Corrupt or unreadable image: {e:#}");
            ExitCode::from(EXIT_CORRUPT)
        }
    }
}

/// Inspects the image and returns the exit code for its verdict. Any error
/// means the file itself could not be read or decoded.
fn run(cli: &Cli) -> Result<ExitCode> {
    let data = std::fs::read(&cli.file)
        .with_context(|| format!("Failed to read image: {}", cli.file.display()))?;
    let fingerprint = hex::encode(Sha256::digest(&data));

    let mut options = if cli.strict {
        ParseOptions::strict()
    } else {
        ParseOptions::new()
    };
    if let Some(limit) = cli.max_size {
        options = options.with_max_image_size(limit);
    }

    let image = Image::parse_with(data, options)
        .with_context(|| format!("Failed to parse image: {}", cli.file.display()))?;
    let report = ImageReport::new(&image);

    if cli.json {
        let mut value = serde_json::to_value(&report).context("Failed to serialize report")?;
        value["sha256"] = serde_json::Value::String(fingerprint);
        let text = serde_json::to_string_pretty(&value).context("Failed to serialize report")?;
        println!("{text}");
    } else {
        print_report(&report, &fingerprint);
    }

    if report.valid {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Invalid or tampered image: {}", report.verdict);
        Ok(ExitCode::from(EXIT_INVALID))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &ImageReport, fingerprint: &str) {
    println!("Size:     {} bytes", report.size);
    println!("SHA-256:  {fingerprint}");
    println!("CRC-32:   {}", report.computed_crc32);
    println!("Verdict:  {}", report.verdict);

    if let Some(header) = &report.header {
        println!(
            "Header:   version {:#010X}, flags {:#010X} (encrypted: {}, signed: {})",
            header.version, header.type_flags, header.encrypted, header.signed
        );
    }
    if let Some(app) = &report.application {
        println!(
            "App:      type {:#010X} [{}], version {:#010X}, product {}",
            app.app_type,
            app.type_names.join(", "),
            app.version,
            app.product_id
        );
    }
    if let Some(bl) = &report.bootloader {
        println!(
            "Bootldr:  {} at {:#010X}, {} bytes",
            bl.version, bl.address, bl.size
        );
    }
    if let Some(se) = &report.se_upgrade {
        println!("SE:       version {:#010X}, {} bytes", se.version, se.size);
    }
    if let Some(dep) = &report.version_dependency {
        println!(
            "Depends:  type {:#04X}, statement {:#04X}, version {:#010X}",
            dep.image_type, dep.statement, dep.version
        );
    }
    if let Some(enc) = &report.encryption {
        println!(
            "Encrypt:  {} blocks, {} bytes",
            enc.data_blocks, enc.data_bytes
        );
    }
    if report.certificate.is_some() {
        println!("Cert:     present");
    }
    if report.signature.is_some() {
        println!("Sig:      present (not verified)");
    }
    if !report.metadata_sizes.is_empty() {
        println!("Metadata: {:?} bytes", report.metadata_sizes);
    }

    println!();
    println!("{:<4} {:<12} {:>10} {}", "#", "ADDRESS", "SIZE", "COMPRESSION");
    println!("{}", "-".repeat(40));
    for (i, section) in report.program_sections.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:>10} {}{}",
            i,
            format!("{:#010X}", section.flash_start_address),
            section.size,
            section.compression,
            if section.erase_first { " (erase)" } else { "" }
        );
    }
}
