//! Bridge configuration: layered JSON/TOML files + CLI overrides.
//!
//! Files are merged in order, later files winning. Objects merge key by
//! key; scalars and arrays replace. A file named `package.json` only
//! contributes its `"sockbridge"` entry. Missing files are skipped quietly,
//! unreadable or malformed ones with a warning.

use crate::error::{BridgeError, BridgeResult};
use crate::rule::{ForwardingRule, MirrorOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Key holding this tool's section inside a `package.json`.
pub const PACKAGE_JSON_KEY: &str = "sockbridge";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Source addresses, paired positionally with `destinations`.
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub destinations: Vec<String>,

    /// Mirror inbound traffic to the console.
    #[serde(default)]
    pub verbose: bool,

    /// Fixed mirror width; absent or `0` means "use the terminal width".
    #[serde(default)]
    pub width: Option<u16>,

    /// Install the signal handler that removes socket files on exit.
    #[serde(default = "default_true")]
    pub register_signal_handler: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destinations: Vec::new(),
            verbose: false,
            width: None,
            register_signal_handler: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    /// Load and merge every readable file in `paths` on top of the defaults.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> BridgeResult<Self> {
        let mut merged = serde_json::to_value(Self::default())
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                debug!(path = %path.display(), "config file not found, skipping");
                continue;
            }
            match read_document(path) {
                Ok(Some(doc)) => {
                    debug!(path = %path.display(), "loaded config");
                    merge_values(&mut merged, doc);
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to load config path"),
            }
        }

        serde_json::from_value(merged).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Replace the configured pairs with a single (source, destination).
    pub fn with_pair(mut self, source: String, destination: String) -> Self {
        self.sources = vec![source];
        self.destinations = vec![destination];
        self
    }

    /// Validate the configuration and build one rule per source.
    pub fn rules(&self) -> BridgeResult<Vec<ForwardingRule>> {
        if self.sources.is_empty() {
            return Err(BridgeError::Config("no forwarding rules configured".into()));
        }
        if self.sources.len() != self.destinations.len() {
            return Err(BridgeError::Config(format!(
                "{} source(s) but {} destination(s); every source needs a destination",
                self.sources.len(),
                self.destinations.len()
            )));
        }

        let mirror = MirrorOptions {
            verbose: self.verbose,
            width: self.width.filter(|w| *w > 0),
        };
        self.sources
            .iter()
            .zip(&self.destinations)
            .map(|(src, dst)| Ok(ForwardingRule::parse(src, dst)?.with_mirror(mirror)))
            .collect()
    }
}

/// Parse one config file. `Ok(None)` means the file has no section for us.
fn read_document(path: &Path) -> Result<Option<Value>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;

    let doc: Value = if path.extension().is_some_and(|ext| ext == "toml") {
        let table: toml::Table = toml::from_str(&content).map_err(|e| e.to_string())?;
        serde_json::to_value(table).map_err(|e| e.to_string())?
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())?
    };

    if path.file_name().is_some_and(|name| name == "package.json") {
        return Ok(doc.get(PACKAGE_JSON_KEY).cloned());
    }
    if !doc.is_object() {
        return Err("top-level value is not an object".into());
    }
    Ok(Some(doc))
}

/// Deep-merge `source` into `target`.
fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            for (key, value) in s {
                if value.is_object() && t.get(&key).is_some_and(Value::is_object) {
                    if let Some(existing) = t.get_mut(&key) {
                        merge_values(existing, value);
                    }
                } else {
                    t.insert(key, value);
                }
            }
        }
        (t, s) => *t = s,
    }
}
