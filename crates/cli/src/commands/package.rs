use eyre::Result;
use hatch_store::{InstallOptions, Installer};

use crate::cli::Commands;
use crate::commands::install::{handle_install, handle_install_repo};
use crate::config::Config;

pub async fn handle_package_command(
    cmd: Commands,
    installer: &Installer,
    config: &Config,
) -> Result<()> {
    match cmd {
        Commands::Install {
            ids,
            version,
            refresh,
            deny_flagged,
            concurrency,
        } => {
            let options = InstallOptions {
                refresh,
                allow_flagged: config.install.allow_flagged && !deny_flagged,
            };
            let concurrency = concurrency.unwrap_or(config.install.concurrency);
            handle_install(installer, ids, version, options, concurrency).await
        }
        Commands::InstallRepo { url, deny_flagged } => {
            let options = InstallOptions {
                refresh: false,
                allow_flagged: config.install.allow_flagged && !deny_flagged,
            };
            handle_install_repo(installer, &url, options).await
        }
        Commands::List { detailed } => handle_list(installer, detailed).await,
        Commands::Uninstall { id } => handle_uninstall(installer, &id).await,
        Commands::Enable { id } => handle_set_enabled(installer, &id, true).await,
        Commands::Disable { id } => handle_set_enabled(installer, &id, false).await,
        Commands::Run { id } => handle_run(installer, &id).await,
        Commands::Config { .. } => Err(eyre::eyre!("config commands do not use the package store")),
    }
}

async fn handle_list(installer: &Installer, detailed: bool) -> Result<()> {
    let installed = installer.list_installed().await?;

    if installed.is_empty() {
        println!("📦 No packages installed");
        println!("💡 Use 'hatch install <id>' to install one");
        return Ok(());
    }

    println!("📦 Installed packages ({}):", installed.len());
    for record in installed {
        let state = if record.enabled { "" } else { " [disabled]" };
        if detailed {
            println!(
                "  📦 {} v{}{}",
                record.manifest.display_name(),
                record.version,
                state
            );
            println!("     ID: {}", record.id);
            println!(
                "     Installed: {}",
                record.installed_at.format("%Y-%m-%d %H:%M")
            );
            if let Some(description) = &record.manifest.description {
                println!("     Description: {}", description);
            }
            if let Some(author) = &record.manifest.author {
                println!("     Author: {}", author);
            }
            if !record.manifest.permissions.is_empty() {
                println!(
                    "     Permissions: {}",
                    record.manifest.permissions.join(", ")
                );
            }
            println!();
        } else {
            println!(
                "  📦 {} v{} - {}{}",
                record.manifest.display_name(),
                record.version,
                record.id,
                state
            );
        }
    }
    Ok(())
}

async fn handle_uninstall(installer: &Installer, id: &str) -> Result<()> {
    if installer.uninstall(id).await? {
        println!("✅ Uninstalled {}", id);
    } else {
        println!("📦 {} is not installed", id);
    }
    Ok(())
}

async fn handle_set_enabled(installer: &Installer, id: &str, enabled: bool) -> Result<()> {
    if !installer.set_enabled(id, enabled).await? {
        return Err(eyre::eyre!("{} is not installed", id));
    }

    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("✅ {} {}", verb, id);
    Ok(())
}

async fn handle_run(installer: &Installer, id: &str) -> Result<()> {
    let Some(record) = installer.get_installed(id).await? else {
        return Err(eyre::eyre!("{} is not installed", id));
    };
    if !record.enabled {
        return Err(eyre::eyre!("{} is disabled; run 'hatch enable {}' first", id, id));
    }

    let mut instance = installer.load_installed(id).await?;
    println!(
        "▶️ Running {} v{} ({} module)",
        instance.manifest().display_name(),
        instance.manifest().version,
        instance.strategy()
    );

    instance.activate()?;
    println!("✅ Activated");
    instance.deactivate()?;
    println!("✅ Deactivated");
    Ok(())
}
