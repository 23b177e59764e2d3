use futures::StreamExt;
use futures::stream;
use hatch_store::{InstallOptions, InstallOutcome, Installer};
use hatch_types::{InstallProgress, InstallStatus};
use semver::Version;

/// Installs `ids` in groups of at most `concurrency` in flight.
///
/// Every id is attempted; failures are reported and counted, not fatal.
pub async fn handle_install(
    installer: &Installer,
    ids: Vec<String>,
    version: Option<Version>,
    options: InstallOptions,
    concurrency: usize,
) -> eyre::Result<()> {
    if version.is_some() && ids.len() > 1 {
        return Err(eyre::eyre!("--version can only be used with a single package"));
    }

    let total = ids.len();
    let version = version.as_ref();
    let options = &options;

    let results: Vec<(String, hatch_store::Result<InstallOutcome>)> = stream::iter(ids)
        .map(|id| async move {
            println!("📦 Installing {}", id);
            let result = installer
                .install(&id, version, options, &print_progress)
                .await;
            (id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut failed = 0;
    for (id, result) in results {
        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                failed += 1;
                eprintln!("❌ Failed to install {}: {}", id, e);
            }
        }
    }

    if failed > 0 {
        return Err(eyre::eyre!("{} of {} installs failed", failed, total));
    }
    Ok(())
}

pub async fn handle_install_repo(
    installer: &Installer,
    url: &str,
    options: InstallOptions,
) -> eyre::Result<()> {
    println!("📦 Installing from {}", url);
    match installer
        .install_from_repository(url, &options, &print_progress)
        .await
    {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Failed to install {}: {}", url, e);
            Err(e.into())
        }
    }
}

fn print_progress(progress: InstallProgress) {
    if progress.status == InstallStatus::Failed {
        return;
    }
    println!(
        "   [{:>3}%] {} {}",
        progress.progress,
        progress.id,
        progress.message.as_deref().unwrap_or(""),
    );
}

fn print_outcome(outcome: &InstallOutcome) {
    let manifest = outcome.instance.manifest();
    let source = if outcome.from_cache {
        "already installed"
    } else {
        "fetched"
    };

    println!(
        "✅ {} v{} ({}, {} module)",
        manifest.display_name(),
        manifest.version,
        source,
        outcome.instance.strategy()
    );
    for flagged in &outcome.flagged {
        println!("   ⚠️ requests {}", flagged);
    }
}
