//! Shared JSON fixtures for tests and benches, looked up by name through
//! `fixtures/manifest.json` at the workspace root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Result<Manifest, String>> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).map_err(|e| format!("fixtures manifest does not parse: {e}"))
});

#[derive(Debug, Deserialize)]
struct Manifest {
    animations: BTreeMap<String, AnimationEntry>,
}

/// Manifest metadata for one animation fixture.
#[derive(Clone, Debug, Deserialize)]
pub struct AnimationEntry {
    pub path: String,
    /// `"continuous"` or `"discrete"`.
    pub strategy: String,
    pub keyframes: usize,
}

fn manifest() -> Result<&'static Manifest> {
    MANIFEST.as_ref().map_err(|e| anyhow!("{e}"))
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

pub mod animations {
    use super::*;

    /// Fixture names in sorted order.
    pub fn keys() -> Vec<String> {
        manifest()
            .map(|m| m.animations.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn entry(name: &str) -> Result<&'static AnimationEntry> {
        manifest()?
            .animations
            .get(name)
            .ok_or_else(|| anyhow!("unknown animation fixture '{name}'"))
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(&entry(name)?.path)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let text = json(name)?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse animation fixture '{name}'"))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(&entry(name)?.path))
    }
}
