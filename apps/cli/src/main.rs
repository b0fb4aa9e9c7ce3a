//! FileShare command-line client entry point.

mod adapter;
mod app;
mod config;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::UploadOptions;

#[derive(Debug, Parser)]
#[command(name = "fileshare", version, about = "Share files through a FileShare server")]
struct Cli {
    /// Store API base URL, e.g. https://share.example/api.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload files or directories and print their share codes.
    Upload {
        /// Files or directories to upload, in order.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Bind the uploaded files to one group code.
        #[arg(long)]
        group: bool,

        /// Group display name (implies --group).
        #[arg(long)]
        group_name: Option<String>,

        /// Ask the server to compress the files.
        #[arg(long)]
        compress: bool,
    },
    /// Resolve a share code to a file or group.
    Lookup { code: String },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = config::Config::load()?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    // Logs go to stderr so stdout carries only results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server_url,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Command::Upload {
                paths,
                group,
                group_name,
                compress,
            } => {
                let options = UploadOptions {
                    paths,
                    group,
                    group_name,
                    compress,
                };
                app::upload(&config, options).await
            }
            Command::Lookup { code } => app::lookup(&config, &code).await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_upload_flags() {
        let cli = Cli::parse_from([
            "fileshare",
            "--server",
            "https://share.example/api",
            "upload",
            "a.txt",
            "photos",
            "--group-name",
            "trip",
            "--compress",
        ]);
        assert_eq!(cli.server.as_deref(), Some("https://share.example/api"));
        match cli.command {
            Command::Upload {
                paths,
                group,
                group_name,
                compress,
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("photos")]);
                assert!(!group);
                assert_eq!(group_name.as_deref(), Some("trip"));
                assert!(compress);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn upload_requires_paths() {
        assert!(Cli::try_parse_from(["fileshare", "upload"]).is_err());
    }

    #[test]
    fn parses_lookup() {
        let cli = Cli::parse_from(["fileshare", "lookup", "AB12CD"]);
        assert!(matches!(cli.command, Command::Lookup { ref code } if code == "AB12CD"));
    }
}
