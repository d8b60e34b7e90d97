//! The `.k210-build` configuration files.

use std::path::{Path, PathBuf};

use anyhow::bail;
use figment::providers::{Data, Env, Format as _, Json, Toml, Yaml};
use figment::Figment;
use k210_build::environment::DEFAULT_BUILD_DIR;
use serde::{Deserialize, Deserializer, Serialize};

use crate::util::logging::LevelFilter;

/// Files searched in every configuration directory, without extension.
const CONFIG_FILE: &str = ".k210-build";

/// Prefix of environment variables overriding configuration values.
const ENV_PREFIX: &str = "K210_BUILD_";

/// Variables below [`ENV_PREFIX`] exported by the build script for `--version`.
/// Cargo sets them on every process it starts.
const VERSION_VARIABLES: &[&str] = &["VERSION", "LONG_VERSION"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    pub build_dir: PathBuf,
    pub src_dir: PathBuf,
    /// Where tool packages such as `tool-kflash-kendryte210` are installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_dir: Option<PathBuf>,
    /// The board manifest (JSON).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LevelFilter>,
    pub ccflags: Vec<String>,
    pub linkflags: Vec<String>,
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program_name: None,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            src_dir: PathBuf::from("src"),
            packages_dir: None,
            board: None,
            log_level: None,
            ccflags: Vec::new(),
            linkflags: Vec::new(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UploadConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Baud rate. Accepts both `speed = 115200` and `speed = "115200"`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "speed_from_string_or_number"
    )]
    pub speed: Option<String>,
    /// Command line of the `custom` upload protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

fn speed_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Speed {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Speed>::deserialize(deserializer)?.map(|speed| match speed {
        Speed::Number(number) => number.to_string(),
        Speed::Text(text) => text,
    }))
}

/// Layered configuration sources, later layers win.
pub struct Configs {
    figment: Figment,
}

impl Configs {
    /// Starts from the built-in defaults and merges the configuration files of
    /// every directory in `dirs`, in order.
    pub fn new(dirs: &[PathBuf]) -> anyhow::Result<Configs> {
        let default_config = serde_json::to_string_pretty(&Config::default())?;
        let mut figment = Figment::from(Data::<Json>::string(&default_config));

        for dir in dirs {
            figment = figment
                .merge(Toml::file(dir.join(format!("{CONFIG_FILE}.toml"))))
                .merge(Json::file(dir.join(format!("{CONFIG_FILE}.json"))))
                .merge(Yaml::file(dir.join(format!("{CONFIG_FILE}.yaml"))))
                .merge(Yaml::file(dir.join(format!("{CONFIG_FILE}.yml"))));
        }

        Ok(Configs { figment })
    }

    /// Merges `K210_BUILD_*` variables, `__` separating nested keys
    /// (`K210_BUILD_UPLOAD__PORT`).
    pub fn with_env(self) -> Configs {
        Configs {
            figment: self.figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(VERSION_VARIABLES)
                    .split("__"),
            ),
        }
    }

    pub fn extract(&self) -> anyhow::Result<Config> {
        match self.figment.extract::<Config>() {
            Ok(config) => Ok(config),
            Err(error) => {
                // Join all the figment errors into a multiline string.
                bail!(
                    "Failed to parse supplied configuration:\n{}",
                    error
                        .into_iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<String>>()
                        .join("\n")
                );
            }
        }
    }

    #[cfg(test)]
    fn merge_toml(self, toml: &str) -> Configs {
        Configs {
            figment: self.figment.merge(Toml::string(toml)),
        }
    }
}

/// Loads the configuration of the project in `project_dir`.
///
/// The user's home directory is searched first, so project settings override
/// personal ones.
pub fn load_config(project_dir: &Path) -> anyhow::Result<Config> {
    let mut dirs = Vec::new();
    if let Some(home) = directories::UserDirs::new().map(|user| user.home_dir().to_path_buf()) {
        dirs.push(home);
    }
    dirs.push(project_dir.to_path_buf());

    Configs::new(&dirs)?.with_env().extract()
}
