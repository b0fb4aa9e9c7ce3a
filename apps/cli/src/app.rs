//! Command runners: wire config, client, coordinator and reporting together.

use std::path::PathBuf;
use std::process::ExitCode;

use fileshare_store_client::Client;
use fileshare_upload::{BatchCoordinator, BatchRequest, collect_units};
use tracing::{info, warn};

use crate::adapter::HttpStore;
use crate::config::Config;
use crate::report;

/// Options for `fileshare upload`.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub paths: Vec<PathBuf>,
    pub group: bool,
    pub group_name: Option<String>,
    pub compress: bool,
}

/// Uploads the given paths as one batch.
///
/// Ctrl-C cancels the batch; the report still lists what finished.
pub async fn upload(config: &Config, options: UploadOptions) -> anyhow::Result<ExitCode> {
    let scan = collect_units(&options.paths);
    for (path, e) in &scan.unreadable {
        warn!(path = %path.display(), error = %e, "skipping unreadable path");
        eprintln!("Skipping {}: {e}", path.display());
    }
    if scan.units.is_empty() {
        anyhow::bail!("nothing to upload");
    }
    info!(
        files = scan.units.len(),
        bytes = scan.total_size(),
        server = %config.server_url,
        "starting upload"
    );

    let store = HttpStore::new(Client::new(config.client_config())?);
    let mut coordinator = BatchCoordinator::new(config.policy());
    let printer = coordinator
        .take_events()
        .map(|events| tokio::spawn(report::print_events(events)));

    let cancel = coordinator.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling upload");
            cancel.cancel();
        }
    });

    let request = BatchRequest {
        units: scan.units,
        group: options.group || options.group_name.is_some(),
        group_name: options.group_name,
        compress: options.compress,
    };
    let outcome = coordinator.run(&store, request).await;

    interrupt.abort();
    drop(coordinator);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    print!("{}", report::render_outcome(&outcome));
    Ok(if outcome.succeeded() > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Resolves a share code and prints what it points to.
pub async fn lookup(config: &Config, code: &str) -> anyhow::Result<ExitCode> {
    let code = code.trim();
    if code.is_empty() {
        anyhow::bail!("share code is empty");
    }

    let client = Client::new(config.client_config())?;
    match client.resolve_code(code).await {
        Ok(found) => {
            print!("{}", report::render_lookup(&client, &found));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!(code, error = %e, "lookup failed");
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
