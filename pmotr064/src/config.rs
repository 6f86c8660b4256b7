//! Configuration du client TR-064
//!
//! La configuration est chargée comme dans les autres crates PMO :
//! 1. configuration par défaut intégrée (`tr064.yaml`)
//! 2. fusion avec un fichier YAML externe s'il est fourni et présent
//! 3. clés passées en minuscules
//! 4. surcharge par variables d'environnement `PMOTR064_CONFIG__SECTION__CLE`
//!
//! ```no_run
//! use std::path::Path;
//! use pmotr064::Tr064Config;
//!
//! // PMOTR064_CONFIG__DEVICE__PASSWORD=secret
//! let config = Tr064Config::load(Some(Path::new("tr064.yaml")))?;
//! let endpoint = config.endpoint();
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::{env, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::endpoint::DeviceEndpoint;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("tr064.yaml");

const ENV_PREFIX: &str = "PMOTR064_CONFIG__";

/// Section `device`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    #[serde(deserialize_with = "scalar_string")]
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "scalar_string")]
    pub username: String,
    #[serde(deserialize_with = "scalar_string")]
    pub password: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            host: "192.168.178.1".to_string(),
            port: 49000,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for DeviceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Section `client`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Chemin du document de description
    #[serde(deserialize_with = "scalar_string")]
    pub description_path: String,
    /// Timeout global d'un échange HTTP
    pub timeout_secs: u64,
    /// Nombre maximal de services acceptés, aucune limite si absent
    pub max_services: Option<usize>,
    /// Échappe `&`, `<`, `>` dans les valeurs de paramètres
    pub escape_params: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            description_path: "/tr64desc.xml".to_string(),
            timeout_secs: 10,
            max_services: None,
            escape_params: true,
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration complète
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tr064Config {
    pub device: DeviceSettings,
    pub client: ClientSettings,
}

impl Tr064Config {
    /// Charge la configuration (défauts, fichier optionnel, environnement)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default: Value = serde_yaml::from_str(DEFAULT_CONFIG)
            .context("Invalid embedded default configuration")?;
        let mut value = lower_keys_value(default);

        match path {
            Some(path) if path.exists() => {
                let data = fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let external: Value = serde_yaml::from_slice(&data)
                    .with_context(|| format!("Invalid YAML in {}", path.display()))?;
                info!(config_file = %path.display(), "Loaded config file");
                merge_yaml(&mut value, &lower_keys_value(external));
            }
            Some(path) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
            }
            None => {}
        }

        apply_env_overrides(&mut value, env::vars());

        serde_yaml::from_value(value).context("Invalid TR-064 configuration")
    }

    /// Charge depuis une chaîne YAML (défauts et environnement non appliqués)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Ok(serde_yaml::from_value(lower_keys_value(value))?)
    }

    pub fn endpoint(&self) -> DeviceEndpoint {
        DeviceEndpoint::new(
            self.device.host.clone(),
            self.device.port,
            self.device.username.clone(),
            self.device.password.clone(),
        )
    }
}

/// Accepte un scalaire YAML quelconque là où une chaîne est attendue
/// (un mot de passe `1234` passé par l'environnement est lu comme un nombre)
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected a scalar value, got {other:?}"
        ))),
    }
}

/// Fusionne récursivement `external` dans `default`
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // scalaires et séquences : on remplace
    }
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

fn apply_env_overrides(config: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = path.split("__").map(str::to_lowercase).collect();
        set_value(config, &path, convert_env_value(&value));
    }
}

fn set_value(data: &mut Value, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return;
    };

    if !matches!(data, Value::Mapping(_)) {
        *data = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = data {
        let entry = map
            .entry(Value::String(first.clone()))
            .or_insert(Value::Null);
        set_value(entry, rest, value);
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}
