use std::fs;

use anyhow::{Context, Result, anyhow};
use camino::Utf8Path;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "manifests"]
struct Manifests;

pub const DEFAULT_MANIFEST: &str = "default.toml";

pub fn get_bytes(path: &str) -> Result<Vec<u8>> {
    let file =
        Manifests::get(path).ok_or_else(|| anyhow!("embedded manifest `{}` missing", path))?;
    Ok(file.data.as_ref().to_vec())
}

pub fn get_string(path: &str) -> Result<String> {
    let bytes = get_bytes(path)?;
    std::str::from_utf8(&bytes)
        .with_context(|| format!("decoding embedded manifest `{}`", path))
        .map(|value| value.to_owned())
}

/// Copy an embedded manifest to `destination`, creating its parent directory.
pub fn write_manifest(destination: &Utf8Path, name: &str) -> Result<()> {
    let bytes = get_bytes(name)?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }
    fs::write(destination, bytes).with_context(|| format!("writing {}", destination))
}
