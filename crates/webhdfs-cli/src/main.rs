//! webhdfs CLI - WebHDFS client with namenode failover and parallel
//! transfers.

mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use walkdir::WalkDir;
use webhdfs::{Client, Config, FileStatus, HdfsError, TransferOptions};

#[derive(Parser)]
#[command(name = "webhdfs")]
#[command(about = "WebHDFS command line client with namenode failover")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file [default: ~/.webhdfs.yaml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cluster alias from the configuration file
    #[arg(short, long, global = true)]
    alias: Option<String>,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    verbosity: String,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file or directory tree
    Upload {
        /// Local source path ('-' streams stdin to a single remote file)
        local: PathBuf,

        /// Remote destination path
        remote: String,

        /// Number of transfer workers [default: from config]
        #[arg(short, long)]
        threads: Option<usize>,

        /// Overwrite an existing destination
        #[arg(short, long)]
        force: bool,

        /// Append to an existing remote file instead of replacing it
        #[arg(short = 'A', long, conflicts_with = "force")]
        append: bool,

        /// Suppress the progress bar
        #[arg(short, long)]
        silent: bool,
    },

    /// Download a remote file or directory tree
    Download {
        /// Remote source path
        remote: String,

        /// Local destination path ('-' streams a single file to stdout)
        local: String,

        /// Number of transfer workers [default: from config]
        #[arg(short, long)]
        threads: Option<usize>,

        /// Overwrite an existing destination
        #[arg(short, long)]
        force: bool,

        /// Suppress the progress bar
        #[arg(short, long)]
        silent: bool,
    },

    /// List a directory
    Ls {
        /// Remote path
        remote: String,

        /// Long listing with permissions, size and modification time
        #[arg(short, long)]
        long: bool,
    },

    /// Show metadata for a path
    Status {
        /// Remote path
        remote: String,
    },

    /// Create a directory and any missing parents
    Mkdir {
        /// Remote path
        remote: String,
    },

    /// Move a path to a new location
    Mv {
        /// Remote source path
        src: String,

        /// Remote destination path
        dst: String,
    },

    /// Remove a path
    Rm {
        /// Remote path
        remote: String,

        /// Remove directories and their contents
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print the fully resolved remote path
    Resolve {
        /// Remote path
        remote: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), HdfsError> {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity, &cli.log_format);

    let config_path = Config::locate(cli.config.as_deref())?;
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path.display());
    let client = Client::from_config(&config, cli.alias.as_deref())?;

    match cli.command {
        Commands::Upload {
            local,
            remote,
            threads,
            force,
            append,
            silent,
        } => {
            if local.as_os_str() == "-" {
                let path =
                    upload_stream(&client, &config, &remote, std::io::stdin().lock(), append, force)?;
                println!("{}", path);
                return Ok(());
            }
            if append {
                if !local.is_file() {
                    return Err(HdfsError::precondition(
                        "Can only append when uploading a single file",
                    ));
                }
                let file = std::fs::File::open(&local)?;
                let path = upload_stream(&client, &config, &remote, file, true, force)?;
                println!("{}", path);
                return Ok(());
            }
            let reporter = if silent {
                progress::Reporter::disabled()
            } else {
                let (files, bytes) = local_totals(&local);
                progress::Reporter::new(files, bytes)
            };
            let options = reporter.attach(transfer_options(&config, threads, force));
            let uploaded = client.upload(&local, &remote, &options);
            reporter.finish();
            println!("{}", uploaded?);
        }

        Commands::Download {
            remote,
            local,
            threads,
            force,
            silent,
        } => {
            if local == "-" {
                let mut reader = client.open(&remote, None, None)?;
                let mut stdout = std::io::stdout().lock();
                std::io::copy(&mut reader, &mut stdout)?;
                return Ok(());
            }
            let reporter = if silent {
                progress::Reporter::disabled()
            } else {
                let (files, bytes) = remote_totals(&client, &remote);
                progress::Reporter::new(files, bytes)
            };
            let options = reporter.attach(transfer_options(&config, threads, force));
            let downloaded = client.download(&remote, Path::new(&local), &options);
            reporter.finish();
            println!("{}", downloaded?.display());
        }

        Commands::Ls { remote, long } => {
            if long {
                for entry in client.list_status(&remote)? {
                    println!("{}", format_entry(&entry, &remote));
                }
            } else {
                for name in client.list(&remote)? {
                    println!("{}", name);
                }
            }
        }

        Commands::Status { remote } => {
            let path = client.resolve(&remote)?;
            let status = client.status(&path)?;
            let kind = if status.is_dir() { "directory" } else { "file" };
            println!("Path:        {}", path);
            println!("Type:        {}", kind);
            println!("Size:        {}", status.length);
            println!("Owner:       {}", status.owner);
            println!("Group:       {}", status.group);
            println!("Permission:  {}", status.permission);
            println!("Replication: {}", status.replication);
            println!("Modified:    {}", format_time(status.modification_time));
        }

        Commands::Mkdir { remote } => {
            client.mkdirs(&remote)?;
        }

        Commands::Mv { src, dst } => {
            if !client.rename(&src, &dst)? {
                return Err(HdfsError::operation(format!(
                    "Unable to rename '{}' to '{}'",
                    src, dst
                )));
            }
        }

        Commands::Rm { remote, recursive } => {
            if !client.delete(&remote, recursive)? {
                return Err(HdfsError::precondition(format!(
                    "Remote path '{}' does not exist",
                    remote
                )));
            }
        }

        Commands::Resolve { remote } => {
            println!("{}", client.resolve(&remote)?);
        }
    }

    Ok(())
}

/// Stream a reader into a single remote file, chunk by chunk. The first
/// chunk issues CREATE unless appending; everything after goes via APPEND.
fn upload_stream(
    client: &Client,
    config: &Config,
    remote: &str,
    mut reader: impl std::io::Read,
    append: bool,
    force: bool,
) -> Result<String, HdfsError> {
    let path = client.resolve(remote)?;
    let mut buffer = vec![0u8; config.transfer.get_chunk_size()];
    let mut written = false;
    loop {
        let filled = read_full(&mut reader, &mut buffer)?;
        if filled == 0 {
            break;
        }
        if written || append {
            client.append(&path, &buffer[..filled])?;
        } else {
            client.create(&path, &buffer[..filled], force)?;
        }
        written = true;
    }
    if !written && !append {
        client.create(&path, &[], force)?;
    }
    Ok(path)
}

fn read_full(reader: &mut impl std::io::Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn transfer_options(config: &Config, threads: Option<usize>, force: bool) -> TransferOptions {
    TransferOptions::new()
        .overwrite(force)
        .concurrency(threads.unwrap_or_else(|| config.transfer.get_workers()))
        .chunk_size(config.transfer.get_chunk_size())
}

/// File and byte counts under a local path, for sizing the progress bar.
/// Unreadable entries are skipped; the transfer itself reports real errors.
fn local_totals(path: &Path) -> (usize, u64) {
    let mut files = 0;
    let mut bytes = 0;
    for entry in WalkDir::new(path).into_iter().flatten() {
        if entry.file_type().is_file() {
            files += 1;
            bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    (files, bytes)
}

/// Remote counterpart of [`local_totals`], from a content summary.
fn remote_totals(client: &Client, remote: &str) -> (usize, u64) {
    match client.content(remote) {
        Ok(summary) => (summary.file_count as usize, summary.length),
        Err(_) => (0, 0),
    }
}

fn format_entry(entry: &FileStatus, queried: &str) -> String {
    let kind = if entry.is_dir() { "d" } else { "-" };
    let name = if entry.path_suffix.is_empty() {
        queried
    } else {
        entry.path_suffix.as_str()
    };
    format!(
        "{}{:<4} {:>3} {:<10} {:<12} {:>12} {} {}",
        kind,
        entry.permission,
        entry.replication,
        entry.owner,
        entry.group,
        entry.length,
        format_time(entry.modification_time),
        name
    )
}

fn format_time(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|when| when.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr: stdout carries listings and streamed file contents.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
