//! `zipgate init` — write a default config file.

use zipgate_config::GateConfig;
use zipgate_core::Result;

pub async fn run() -> Result<()> {
    let config_dir = GateConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Zipgate — Setup");
    println!("===============\n");

    if !config_dir.exists() {
        tokio::fs::create_dir_all(&config_dir).await?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
        return Ok(());
    }

    tokio::fs::write(&config_path, GateConfig::default_toml()).await?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Export ZIPLINE_TOKEN (preferred) or set remote.token in the file");
    println!("   2. Set remote.url to your Zipline server");
    println!("   3. Run: zipgate list\n");

    Ok(())
}
