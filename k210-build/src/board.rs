//! Board manifests.
//!
//! A board is described by a JSON document in the PlatformIO board format.
//! Only a handful of keys are interpreted, everything else is kept and can be
//! looked up by its dotted path.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

/// The burn tool value telling kflash to pick the serial port on its own.
pub const AUTO_PORT_BURN_TOOL: &str = "goE";

#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum BoardError {
    /// Failed to read the board manifest.
    Io(#[source] std::io::Error),
    /// Failed to parse the board manifest.
    Parse(#[source] serde_json::Error),
    /// The board manifest is not a JSON object.
    NotAnObject,
}

/// Read-only view of a board manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    root: Value,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            root: Value::Object(Default::default()),
        }
    }
}

impl BoardConfig {
    pub fn from_value(root: Value) -> Result<Self, BoardError> {
        if !root.is_object() {
            return Err(BoardError::NotAnObject);
        }
        Ok(Self { root })
    }

    pub fn from_json_str(json: &str) -> Result<Self, BoardError> {
        Self::from_value(serde_json::from_str(json).map_err(BoardError::Parse)?)
    }

    pub fn load(path: &Path) -> Result<Self, BoardError> {
        let json = std::fs::read_to_string(path).map_err(BoardError::Io)?;
        tracing::debug!("Loaded board manifest {}", path.display());
        Self::from_json_str(&json)
    }

    /// Looks up a value by its dotted path, e.g. `upload.burn_tool`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.root, |value, key| value.as_object()?.get(key))
    }

    /// Looks up a scalar and renders it as a string.
    ///
    /// Numbers are common for speeds and addresses, so they are accepted too.
    pub fn get_str(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            Value::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// The display name of the board, if the manifest has one.
    pub fn name(&self) -> Option<String> {
        self.get_str("name")
    }

    pub fn upload_protocol(&self) -> Option<String> {
        self.get_str("upload.protocol")
    }

    pub fn upload_speed(&self) -> Option<String> {
        self.get_str("upload.speed")
    }

    pub fn upload_port(&self) -> Option<String> {
        self.get_str("upload.port")
    }

    pub fn burn_tool(&self) -> Option<String> {
        self.get_str("upload.burn_tool")
    }

    pub fn flash_start(&self) -> Option<String> {
        self.get_str("upload.flash_start")
    }

    /// The `debug.tools` table. Entries which do not parse are skipped.
    pub fn debug_tools(&self) -> DebugTools {
        let Some(tools) = self.get("debug.tools").and_then(Value::as_object) else {
            return DebugTools::default();
        };

        let tools = tools
            .iter()
            .filter_map(|(name, tool)| {
                match DebugTool::deserialize(tool) {
                    Ok(tool) => Some((name.clone(), tool)),
                    Err(error) => {
                        tracing::warn!("Ignoring malformed debug tool '{}': {}", name, error);
                        None
                    }
                }
            })
            .collect();

        DebugTools { tools }
    }
}

/// Debug tools a board supports, keyed by protocol name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugTools {
    tools: BTreeMap<String, DebugTool>,
}

impl DebugTools {
    pub fn get(&self, name: &str) -> Option<&DebugTool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DebugTool {
    #[serde(default)]
    pub server: Option<DebugServer>,
    #[serde(default)]
    pub onboard: bool,
    #[serde(default)]
    pub default: bool,
}

impl DebugTool {
    /// Extra arguments for the debug server, empty if none are declared.
    pub fn server_arguments(&self) -> &[String] {
        self.server
            .as_ref()
            .map(|server| server.arguments.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DebugServer {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
}
