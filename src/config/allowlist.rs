// src/config/allowlist.rs
//! Symbol allow-list loading. Supports TOML (`symbols = [...]`) or a JSON array.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

pub const ENV_PATH: &str = "SYMBOL_ALLOWLIST_PATH";
pub const ENV_INLINE: &str = "SYMBOL_ALLOWLIST";
const DEFAULT_TOML: &str = "config/symbol_allowlist.toml";
const DEFAULT_JSON: &str = "config/symbol_allowlist.json";

/// Load the allow-list from an explicit path.
pub fn load_allowlist_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading allow-list from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_allowlist(&content, ext.as_str())
}

/// Resolve the allow-list file:
/// 1) `path_override` (the value of $SYMBOL_ALLOWLIST_PATH), which must exist
/// 2) config/symbol_allowlist.toml
/// 3) config/symbol_allowlist.json
///
/// No file at all is an empty list.
pub fn load_allowlist_default(path_override: Option<&str>) -> Result<Vec<String>> {
    if let Some(p) = path_override {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_allowlist_from(&pb);
        }
        return Err(anyhow!("{ENV_PATH} points to non-existent path {p}"));
    }
    for fallback in [DEFAULT_TOML, DEFAULT_JSON] {
        let p = PathBuf::from(fallback);
        if p.exists() {
            return load_allowlist_from(&p);
        }
    }
    Ok(Vec::new())
}

/// Comma- or whitespace-separated inline list.
pub fn parse_inline(s: &str) -> Vec<String> {
    clean_list(
        s.split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect(),
    )
}

fn parse_allowlist(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("symbols");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported allow-list format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlList {
        symbols: Vec<String>,
    }
    let v: TomlList = toml::from_str(s)?;
    Ok(clean_list(v.symbols))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}
