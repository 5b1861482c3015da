//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `volv0x.toml` in the working directory. Every field except the
//! peripheral selector has a default, so the file is optional when
//! `VOLV0X_PERIPHERAL` is set. Environment variables take precedence over
//! file values.

use serde::Deserialize;

use volv0x_adapter_ble::BleConfig;
use volv0x_app::router::RouterConfig;
use volv0x_domain::gatt::{DEFAULT_ATT_MTU, GattTarget, MAX_ATT_MTU};
use volv0x_domain::payload::{ByteOrder, PayloadCodec};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which peripheral to scan for.
    pub peripheral: BleConfig,
    /// GATT layout and payload format.
    pub gatt: GattConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// What to print on stdout.
    pub output: OutputConfig,
}

/// GATT layout of the peripheral firmware.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GattConfig {
    /// Service carrying the telemetry characteristic.
    pub service_uuid: String,
    /// Telemetry characteristic (read / write / notify).
    pub characteristic_uuid: String,
    /// Byte order of the two `u16` payload fields.
    pub byte_order: ByteOrder,
    /// MTU to request once connected; nothing is requested when unset.
    pub mtu: Option<u16>,
    /// Write the greeting once notifications are enabled.
    pub greet: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Stdout output configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print every connection snapshot as one JSON line.
    pub snapshots_as_json: bool,
}

impl Config {
    /// Load configuration from `volv0x.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, if an
    /// override cannot be parsed, or if the resulting configuration does not
    /// validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("volv0x.toml")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides resolved by `lookup` (environment variable names).
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("VOLV0X_PERIPHERAL") {
            self.peripheral.address = Some(val);
        }
        if let Some(val) = lookup("VOLV0X_SERVICE_UUID") {
            self.gatt.service_uuid = val;
        }
        if let Some(val) = lookup("VOLV0X_CHARACTERISTIC_UUID") {
            self.gatt.characteristic_uuid = val;
        }
        if let Some(val) = lookup("VOLV0X_BYTE_ORDER") {
            self.gatt.byte_order = val
                .parse()
                .map_err(|err| ConfigError::Validation(format!("VOLV0X_BYTE_ORDER: {err}")))?;
        }
        if let Some(val) = lookup("VOLV0X_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.peripheral.address.is_none() && self.peripheral.name.is_none() {
            return Err(ConfigError::Validation(
                "peripheral address or name must be set".to_string(),
            ));
        }
        if self.peripheral.scan_duration_secs == 0 {
            return Err(ConfigError::Validation(
                "scan duration must be non-zero".to_string(),
            ));
        }
        if self.peripheral.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "event capacity must be non-zero".to_string(),
            ));
        }
        if let Some(mtu) = self.gatt.mtu
            && !(DEFAULT_ATT_MTU..=MAX_ATT_MTU).contains(&mtu)
        {
            return Err(ConfigError::Validation(format!(
                "mtu must be between {DEFAULT_ATT_MTU} and {MAX_ATT_MTU}, got {mtu}"
            )));
        }
        self.target()?;
        Ok(())
    }

    /// Service + characteristic pair to track.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when either UUID is malformed.
    pub fn target(&self) -> Result<GattTarget, ConfigError> {
        GattTarget::parse(&self.gatt.service_uuid, &self.gatt.characteristic_uuid)
            .map_err(|err| ConfigError::Validation(format!("invalid GATT uuid: {err}")))
    }

    /// Router settings derived from the `[gatt]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when either UUID is malformed.
    pub fn router_config(&self) -> Result<RouterConfig, ConfigError> {
        Ok(RouterConfig {
            target: self.target()?,
            codec: PayloadCodec::new(self.gatt.byte_order),
        })
    }
}

impl Default for GattConfig {
    fn default() -> Self {
        Self {
            service_uuid: GattTarget::DEFAULT_SERVICE.to_string(),
            characteristic_uuid: GattTarget::DEFAULT_CHARACTERISTIC.to_string(),
            byte_order: ByteOrder::default(),
            mtu: None,
            greet: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "volv0xd=info,volv0x_app=info,volv0x_adapter_ble=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
