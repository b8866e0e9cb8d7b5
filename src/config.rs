/*!
Configuration for the `metrix` agent.

Configuration is read from a JSON file, by default `~/.config/metrix/config.json`, and then
overridden by command-line arguments. Every field in the file is optional:

```json
{
  "interval": 10,
  "otlp": {
    "endpoint": "https://api.axiom.co/v1/metrics",
    "headers": { "Authorization": "Bearer token123" },
    "format": "json"
  },
  "metrics": { "fan": false }
}
```
*/

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use metrix_otlp::data::Encoding;
use serde::{Deserialize, Serialize};

use crate::{registry::EnabledMetrics, Error};

pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_ENDPOINT: &str = "https://api.axiom.co/v1/metrics";

/**
The complete agent configuration.
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetrixConfig {
    /**
    Seconds between collection cycles.
    */
    pub interval: u64,
    pub otlp: OtlpConfig,
    pub metrics: MetricsToggle,
}

impl Default for MetrixConfig {
    fn default() -> Self {
        MetrixConfig {
            interval: DEFAULT_INTERVAL_SECS,
            otlp: OtlpConfig::default(),
            metrics: MetricsToggle::default(),
        }
    }
}

/**
Where and how to export metrics.
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OtlpConfig {
    pub endpoint: String,
    /**
    Extra headers sent with every request, like `Authorization`.
    */
    pub headers: BTreeMap<String, String>,
    pub format: Format,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        OtlpConfig {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            headers: BTreeMap::new(),
            format: Format::default(),
        }
    }
}

/**
The wire format for exported metrics.
*/
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    /**
    Binary protobuf.
    */
    #[serde(alias = "protobuf")]
    #[value(alias = "protobuf")]
    Binary,
}

impl From<Format> for Encoding {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => Encoding::Json,
            Format::Binary => Encoding::Proto,
        }
    }
}

/**
Which collectors are switched on. Everything is on by default.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsToggle {
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
    pub network: bool,
    pub load: bool,
    pub swap: bool,
    pub battery: bool,
    pub disk_io: bool,
    pub uptime: bool,
    pub thermal: bool,
    pub wifi: bool,
    pub bluetooth: bool,
    pub display: bool,
    pub fan: bool,
}

impl Default for MetricsToggle {
    fn default() -> Self {
        MetricsToggle {
            cpu: true,
            memory: true,
            disk: true,
            network: true,
            load: true,
            swap: true,
            battery: true,
            disk_io: true,
            uptime: true,
            thermal: true,
            wifi: true,
            bluetooth: true,
            display: true,
            fan: true,
        }
    }
}

impl MetricsToggle {
    /**
    The toggles keyed by collector name.
    */
    pub fn to_enabled(&self) -> EnabledMetrics {
        EnabledMetrics::from_iter([
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("disk", self.disk),
            ("network", self.network),
            ("load", self.load),
            ("swap", self.swap),
            ("battery", self.battery),
            ("diskIo", self.disk_io),
            ("uptime", self.uptime),
            ("thermal", self.thermal),
            ("wifi", self.wifi),
            ("bluetooth", self.bluetooth),
            ("display", self.display),
            ("fan", self.fan),
        ])
    }
}

/**
Values given on the command line, which take precedence over the configuration file.
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub interval: Option<u64>,
    pub endpoint: Option<String>,
    pub headers: Vec<(String, String)>,
    pub format: Option<Format>,
}

/**
The default location of the configuration file, `~/.config/metrix/config.json`.
*/
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("metrix").join("config.json"))
}

impl MetrixConfig {
    /**
    Load configuration from `path`, or from the default location if no path is given.

    A missing file at the default location gives the default configuration. A file given
    explicitly must exist.
    */
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) => match Self::from_file(&path) {
                    Err(_) if !path.exists() => Ok(MetrixConfig::default()),
                    config => config,
                },
                None => Ok(MetrixConfig::default()),
            },
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let json = fs::read_to_string(path).map_err(|e| {
            Error::new(
                format_args!("failed to read config file {}", path.display()),
                e,
            )
        })?;

        Self::from_json(&json).map_err(|e| {
            Error::new(
                format_args!("invalid config file {}", path.display()),
                e,
            )
        })
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::new("failed to parse config", e))
    }

    /**
    Apply command-line overrides.

    Headers are merged, with command-line values replacing file values with the same name.
    Header names are compared case-insensitively.
    */
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }

        if let Some(endpoint) = overrides.endpoint {
            self.otlp.endpoint = endpoint;
        }

        if let Some(format) = overrides.format {
            self.otlp.format = format;
        }

        for (name, value) in overrides.headers {
            self.otlp
                .headers
                .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            self.otlp.headers.insert(name, value);
        }

        self
    }

    /**
    Check the configuration is usable.
    */
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval == 0 {
            return Err(Error::msg(
                "interval must be a positive number of seconds",
            ));
        }

        metrix_otlp::validate_endpoint(&self.otlp.endpoint)
            .map_err(|e| Error::new("invalid OTLP endpoint", e))?;

        Ok(())
    }

    pub fn encoding(&self) -> Encoding {
        self.otlp.format.into()
    }

    pub fn enabled_metrics(&self) -> EnabledMetrics {
        self.metrics.to_enabled()
    }
}
