//! stego-vdisk - a virtual disk hidden in the low bits of ordinary files.
//!
//! Every command opens the carrier directory, runs against the single
//! virtual disk file and saves before exiting.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use stego_vdisk::bridge::FILE_NAME;
use stego_vdisk::config::{carrier_params, CarrierOptions};
use stego_vdisk::{StegoConfig, StegoStorage, VirtualDisk};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LOGGING_LEVEL";

#[derive(Parser)]
#[command(name = "stego-vdisk")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Steganographic virtual disk over a directory of carrier files",
    long_about = "Hides one virtual disk file in the least significant bits of raw files and BMP images, scattered by a password-derived permutation and protected by a Hamming code."
)]
struct Cli {
    /// JSON config file with encoder, global_perm and local_perm
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Low-order bits used per carrier byte (1-4)
    #[arg(long, global = true, default_value = "1")]
    bits_per_unit: u8,

    /// Use the built-in default key instead of prompting for a password
    #[arg(long, global = true)]
    no_password: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show carrier pool and capacity details
    Info {
        /// Directory containing carrier files
        carrier_dir: PathBuf,
    },

    /// Write data into the virtual disk
    Write {
        /// Directory containing carrier files
        carrier_dir: PathBuf,

        /// Byte offset in the virtual disk
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Input file to write
        #[arg(long, conflicts_with = "data")]
        input: Option<PathBuf>,

        /// String data to write
        #[arg(long, conflicts_with = "input")]
        data: Option<String>,
    },

    /// Read data from the virtual disk
    Read {
        /// Directory containing carrier files
        carrier_dir: PathBuf,

        /// Byte offset in the virtual disk
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Number of bytes (default: to the end of the disk)
        #[arg(long)]
        length: Option<u64>,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Copy the whole virtual disk image to a file
    Export {
        /// Directory containing carrier files
        carrier_dir: PathBuf,

        /// Destination image file
        output: PathBuf,
    },

    /// Copy an image file into the virtual disk, truncated to fit
    Import {
        /// Directory containing carrier files
        carrier_dir: PathBuf,

        /// Source image file
        input: PathBuf,
    },

    /// Decode every block and report damage
    Health {
        /// Directory containing carrier files
        carrier_dir: PathBuf,
    },

    /// Print the effective configuration in config file format
    Config {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let session = Session {
        config: cli.config,
        options: CarrierOptions::new(cli.bits_per_unit, carrier_params::RESERVED_HEADER_BYTES),
        no_password: cli.no_password,
    };

    match cli.command {
        Commands::Info { carrier_dir } => cmd_info(&session, &carrier_dir),

        Commands::Write {
            carrier_dir,
            offset,
            input,
            data,
        } => cmd_write(&session, &carrier_dir, offset, input, data),

        Commands::Read {
            carrier_dir,
            offset,
            length,
            output,
        } => cmd_read(&session, &carrier_dir, offset, length, output),

        Commands::Export {
            carrier_dir,
            output,
        } => cmd_export(&session, &carrier_dir, &output),

        Commands::Import { carrier_dir, input } => cmd_import(&session, &carrier_dir, &input),

        Commands::Health { carrier_dir } => cmd_health(&session, &carrier_dir),

        Commands::Config { output } => cmd_config(&session, output),
    }
}

/// Options shared by every command.
struct Session {
    config: Option<PathBuf>,
    options: CarrierOptions,
    no_password: bool,
}

impl Session {
    fn load(&self, carrier_dir: &Path) -> anyhow::Result<StegoStorage> {
        let mut storage = StegoStorage::with_options(self.options);
        match &self.config {
            Some(path) => storage
                .configure_from_file(path)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            None => storage.configure_default()?,
        }

        let password = if self.no_password {
            String::new()
        } else {
            prompt_password("Password: ")?
        };

        storage
            .open(carrier_dir, &password)
            .with_context(|| format!("Cannot open carriers in {}", carrier_dir.display()))?;
        storage.load()?;
        Ok(storage)
    }

    fn mount(&self, carrier_dir: &Path) -> anyhow::Result<VirtualDisk> {
        Ok(VirtualDisk::new(self.load(carrier_dir)?)?)
    }
}

fn prompt_password(prompt: &str) -> io::Result<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Ok(password),
        Err(_) => {
            eprint!("{}", prompt);
            io::stderr().flush()?;
            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            Ok(password.trim().to_string())
        }
    }
}

fn cmd_info(session: &Session, carrier_dir: &Path) -> anyhow::Result<()> {
    let mut storage = session.load(carrier_dir)?;
    let info = storage.info()?;

    println!("Stego Virtual Disk Information");
    println!("==============================");
    println!("Carrier directory: {}", info.root_dir.display());
    println!("Carrier files:     {}", info.carrier_count);
    println!(
        "Key:               {}{}",
        info.key_fingerprint,
        if info.default_key { " (default)" } else { "" }
    );
    println!();
    println!("Configuration:");
    println!("  Encoder:         {}", info.config.encoder);
    println!("  Global perm:     {}", info.config.global_perm);
    println!("  Local perm:      {}", info.config.local_perm);
    println!();
    println!("Capacity:");
    println!("  Raw:             {} bits", info.raw_bits);
    println!("  Usable:          {} bits", info.usable_bits);
    println!("  Disk file:       {} ({} bytes)", FILE_NAME, info.usable_bytes);

    storage.close()?;
    Ok(())
}

fn cmd_write(
    session: &Session,
    carrier_dir: &Path,
    offset: u64,
    input: Option<PathBuf>,
    data: Option<String>,
) -> anyhow::Result<()> {
    let content = match (input, data) {
        (Some(path), None) => {
            std::fs::read(&path).with_context(|| format!("Cannot read {}", path.display()))?
        }
        (None, Some(s)) => s.into_bytes(),
        (None, None) => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
        (Some(_), Some(_)) => bail!("--input and --data are mutually exclusive"),
    };

    let mut storage = session.load(carrier_dir)?;
    storage.write(&content, offset)?;
    storage.close()?;
    println!("Wrote {} bytes at offset {}", content.len(), offset);

    Ok(())
}

fn cmd_read(
    session: &Session,
    carrier_dir: &Path,
    offset: u64,
    length: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut storage = session.load(carrier_dir)?;
    let length = match length {
        Some(length) => length,
        None => storage.size().saturating_sub(offset),
    };

    let mut data = vec![0u8; usize::try_from(length)?];
    let report = storage.read(&mut data, offset)?;
    storage.close()?;
    if !report.is_reliable() {
        eprintln!(
            "Warning: {} of {} blocks could not be corrected",
            report.stats.uncorrectable, report.stats.blocks
        );
    }

    match output {
        Some(path) => {
            std::fs::write(&path, &data)?;
            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            io::stdout().write_all(&data)?;
        }
    }

    Ok(())
}

fn cmd_export(session: &Session, carrier_dir: &Path, output: &Path) -> anyhow::Result<()> {
    let disk = session.mount(carrier_dir)?;
    let mut image = vec![0u8; usize::try_from(disk.size())?];
    let report = disk.read_at(FILE_NAME, 0, &mut image)?;
    disk.unmount()?;

    std::fs::write(output, &image[..report.bytes])
        .with_context(|| format!("Cannot write {}", output.display()))?;
    println!("Exported {} bytes to {}", report.bytes, output.display());
    if !report.is_reliable() {
        eprintln!(
            "Warning: {} blocks could not be corrected",
            report.stats.uncorrectable
        );
    }

    Ok(())
}

fn cmd_import(session: &Session, carrier_dir: &Path, input: &Path) -> anyhow::Result<()> {
    let image = std::fs::read(input).with_context(|| format!("Cannot read {}", input.display()))?;

    let disk = session.mount(carrier_dir)?;
    let written = disk.write_at(FILE_NAME, 0, &image)?;
    disk.unmount()?;

    println!("Imported {} bytes from {}", written, input.display());
    if written < image.len() {
        eprintln!(
            "Warning: image truncated, {} bytes did not fit",
            image.len() - written
        );
    }

    Ok(())
}

fn cmd_health(session: &Session, carrier_dir: &Path) -> anyhow::Result<()> {
    let mut storage = session.load(carrier_dir)?;
    let stats = storage.scan()?;
    storage.close()?;

    println!("Virtual Disk Health Report");
    println!("==========================");
    println!("Blocks:           {}", stats.blocks);
    println!("Corrected:        {}", stats.corrected);
    println!("Uncorrectable:    {}", stats.uncorrectable);
    println!("Damaged:          {:.1}%", stats.damage_percent());

    if stats.is_reliable() {
        println!();
        println!("No uncorrectable blocks");
    }

    Ok(())
}

fn cmd_config(session: &Session, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match &session.config {
        Some(path) => StegoConfig::from_json_file(path)
            .with_context(|| format!("Invalid config file {}", path.display()))?,
        None => StegoConfig::default(),
    };
    let json = config.to_json_string()?;

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{}\n", json))
                .with_context(|| format!("Cannot write {}", path.display()))?;
            println!("Wrote configuration to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
