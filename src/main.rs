mod cli;
mod config;
mod imap;
mod logging;
mod maildir;
mod repository;
mod sync;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

/// Archive an IMAP mailbox (Gmail by default) into a local maildir hierarchy.
///
/// Every run only fetches messages that are not archived yet. Messages are never deleted
/// locally and their flags on the server are left untouched. Either list the remote folders
/// with --folders or archive them into --archivedir.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file, defaults to $XDG_CONFIG_HOME/imaparchive/config.toml. Command line
    /// options override its settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// One of error, warn, info, debug or trace. RUST_LOG takes precedence.
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    loglevel: LevelFilter,

    /// Username to log in with.
    #[arg(short, long)]
    username: Option<String>,

    /// IMAP server, imap.gmail.com if not configured.
    #[arg(long)]
    host: Option<String>,

    /// IMAP over TLS port, 993 if not configured.
    #[arg(long)]
    port: Option<u16>,

    /// Only list the folders on the server.
    #[arg(short, long, conflicts_with_all = ["archivedir", "includes", "excludes"])]
    folders: bool,

    /// Directory to archive the folders into.
    #[arg(short, long)]
    archivedir: Option<PathBuf>,

    /// Archive only these folders and their subfolders ('/'-delimited).
    #[arg(short, long = "include", num_args = 1..)]
    includes: Vec<String>,

    /// Skip these folders and their subfolders ('/'-delimited). Ignored with --include.
    #[arg(short = 'x', long = "exclude", num_args = 1..)]
    excludes: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logging::init(args.loglevel);

    cli::run(args).await
}
