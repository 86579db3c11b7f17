//!
//! fal-inspect
//! -----------
//! Loads a JSON manifest of storages and files into the in-memory collaborators
//! and prints the listing snapshot of every file as JSON.

use std::env;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fal_index::resource::{load_manifest, GlobalResourceConfig, Manifest};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <manifest.json> [--pretty]\n\nEnvironment:\n  FAL_ENCRYPTION_KEY               secret mixed into file checksums\n  FAL_EXTRACT_METADATA_ON_INDEX    extract metadata while indexing (true/false)\n  FAL_CREATE_INDEX_IF_MISSING      create missing index records on access (true/false)\n  RUST_LOG                         log filter, defaults to 'info'"
    );
}

fn main() -> Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("fal-inspect");
    let pretty = args.iter().any(|a| a == "--pretty");
    let Some(path) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        print_usage(program);
        bail!("missing manifest path");
    };

    let global = GlobalResourceConfig::from_env();
    info!(target: "fal", "fal-inspect starting: manifest='{}', checksum_key_set={}", path, !global.encryption_key.is_empty());

    let manifest = Manifest::from_path(path)?;
    let loaded = load_manifest(&manifest, global)?;
    let mut rows = Vec::with_capacity(loaded.files.len());
    for file in &loaded.files {
        rows.push(Value::Object(file.to_array()?));
    }
    let out = Value::Array(rows);
    if pretty {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
