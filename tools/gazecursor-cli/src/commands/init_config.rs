//! Write the default configuration file.

use gazecursor_common::config::{config_file_path, AppConfig};

pub fn run(force: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let written = AppConfig::default().save()?;
    println!("Wrote default configuration to {}", written.display());
    Ok(())
}
