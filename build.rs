//! Build script for the Salesforce Units front-end.
//!
//! Copies `.env.example` from the crate root into the platform-specific local
//! data directory (`sfunits/.env.example`), next to the `.env` file that
//! `config::load_env` reads at start-up:
//! - Linux: `~/.local/share/sfunits/.env.example`
//! - macOS: `~/Library/Application Support/sfunits/.env.example`
//! - Windows: `%LOCALAPPDATA%/sfunits/.env.example`
//!
//! A missing template only produces a cargo warning.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Re-run if the template changes
    println!("cargo:rerun-if-changed=.env.example");

    // Where to copy FROM (crate root)
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("sfunits");
    fs::create_dir_all(&out_dir)?;

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
