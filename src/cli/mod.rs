mod archive;
mod list;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::CommandFactory as _;
use log::{info, warn};

use crate::{
    Args,
    cli::{archive::archive_folders, list::folder_names},
    config::{Config, ConfigError, Overrides},
    imap::Client,
};

pub async fn run(args: Args) -> Result<ExitCode> {
    let mut config = Config::load_from_file(args.config.as_deref())?;
    config.apply(Overrides {
        username: args.username,
        host: args.host,
        port: args.port,
        archivedir: args.archivedir,
        includes: args.includes,
        excludes: args.excludes,
    });

    let root = if args.folders {
        None
    } else if let Some(archivedir) = config.archival().archivedir() {
        Some(archive::prepare_root(archivedir)?)
    } else {
        Args::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let username = config
        .authentication()
        .username()
        .ok_or(ConfigError::MissingUsername)?;
    let password = config.authentication().password()?;
    let server = config.server();
    let mut session = Client::login(server.host(), server.port(), username, &password)
        .await
        .with_context(|| format!("cannot log in to {}:{}", server.host(), server.port()))?;
    info!("connected");

    let result = match root {
        Some(root) => {
            archive_folders(
                &mut session,
                &root,
                config.archival().includes(),
                config.archival().excludes(),
            )
            .await
            .map(|success| {
                if success {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            })
        }
        None => folder_names(&mut session).await.map(|names| {
            for name in names {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }),
    };

    if let Err(e) = session.logout().await {
        warn!("logout failed: {e}");
    }
    result
}
