use std::path::Path;

use eyre::Result;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub async fn handle_config_command(cmd: ConfigCommands, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => handle_set_config(path, &key, &value).await,
        ConfigCommands::Get { key } => handle_get_config(path, &key).await,
        ConfigCommands::Show => handle_show_config(path).await,
        ConfigCommands::Reset => handle_reset_config(path).await,
    }
}

async fn handle_set_config(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load(path).await?;

    if let Err(e) = config.set_value(key, value) {
        println!("❌ Failed to set configuration: {}", e);
        return Err(e);
    }

    config.save(path).await?;
    println!("✅ Configuration updated: {} = {}", key, value);
    Ok(())
}

async fn handle_get_config(path: &Path, key: &str) -> Result<()> {
    let config = Config::load(path).await?;
    println!("{}: {}", key, config.get_value(key)?);
    Ok(())
}

async fn handle_show_config(path: &Path) -> Result<()> {
    let config = Config::load(path).await?;
    println!("{}", config.show_all());
    println!("\nFile: {}", path.display());
    Ok(())
}

async fn handle_reset_config(path: &Path) -> Result<()> {
    Config::reset(path).await?;
    println!("✅ Configuration reset to defaults");
    Ok(())
}
