//! Configuration file formats, all normalized to a JSON value tree.

use anyhow::Result;
use log::debug;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::ExtraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
    Ini,
}

impl ConfigFormat {
    /// All formats, in the order they are tried on unknown extensions.
    pub const ALL: [ConfigFormat; 4] = [
        ConfigFormat::Toml,
        ConfigFormat::Yaml,
        ConfigFormat::Json,
        ConfigFormat::Ini,
    ];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ConfigFormat::Toml => &["toml"],
            ConfigFormat::Yaml => &["yaml", "yml"],
            ConfigFormat::Json => &["json"],
            ConfigFormat::Ini => &["ini", "cfg"],
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    /// Parse `content` into a value tree.
    pub fn parse(&self, content: &str) -> Result<Value, String> {
        match self {
            ConfigFormat::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
            ConfigFormat::Ini => parse_ini(content),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
            ConfigFormat::Ini => "INI",
        };
        f.write_str(name)
    }
}

/// INI sections with dotted names (`[cli.subcommand]`) become nested tables.
fn parse_ini(content: &str) -> Result<Value, String> {
    let ini = ini::Ini::load_from_str(content).map_err(|e| e.to_string())?;
    let mut root = Map::new();
    for (section, properties) in ini.iter() {
        let mut table = &mut root;
        if let Some(name) = section {
            for part in name.split('.') {
                let entry = table
                    .entry(part.trim().to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                table = match entry {
                    Value::Object(map) => map,
                    _ => return Err(format!("section {} clashes with a key", name)),
                };
            }
        }
        for (key, value) in properties.iter() {
            table.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Ok(Value::Object(root))
}

/// Parse a configuration file. The format is picked from the extension when
/// it is known, else every allowed format is tried in turn.
pub fn parse_config(path: &Path, content: &str, formats: &[ConfigFormat]) -> Result<Value> {
    let candidates: Vec<ConfigFormat> = match ConfigFormat::from_path(path) {
        Some(format) if formats.contains(&format) => vec![format],
        _ => formats.to_vec(),
    };

    let mut reasons = Vec::new();
    for format in candidates {
        match format.parse(content) {
            Ok(Value::Null) => {
                debug!("{} is empty, parsed as {}", path.display(), format);
                return Ok(Value::Object(Map::new()));
            }
            Ok(value @ Value::Object(_)) => {
                debug!("Parsed {} as {}", path.display(), format);
                return Ok(value);
            }
            Ok(_) => reasons.push(format!("{}: top-level is not a table", format)),
            Err(e) => reasons.push(format!("{}: {}", format, e)),
        }
    }

    Err(ExtraError::MalformedConfig {
        path: path.to_path_buf(),
        reason: reasons.join("; "),
    }
    .into())
}
