use crate::config::{generate::generate_starter_config, load_config, user_config_path};
use std::fs;
use std::path::{Path, PathBuf};

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let content = generate_starter_config();

    if stdout {
        print!("{}", content);
        return Ok(());
    }

    let path = user_config_path().ok_or("Cannot determine home directory. Use --stdout instead.")?;
    write_config(&path, &content)?;
    println!("Config file written to {}", path.display());
    Ok(())
}

/// Write `content` to `path`, refusing to overwrite an existing file.
pub fn write_config(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!(
            "Config file already exists at {}. Remove it first or use --stdout to print the config",
            path.display()
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;

    println!("Validating config file: {}", path.display());

    match load_config(&path) {
        Ok(_) => {
            println!("✓ Config is valid");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Config validation failed:\n{}", e);
            std::process::exit(1);
        }
    }
}
