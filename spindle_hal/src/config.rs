//! Spindle HAL configuration file.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "spindle-hal"
//!
//! [select]
//! default_spindle = 0
//! slot_defaults = ["yl620a"]
//!
//! [vfd]
//! at_speed_tolerance = 5.0
//!
//! [[drives]]
//! name = "PWM"
//! ref_id = "pwm"
//! kind = "basic"
//!
//! [[drives]]
//! name = "YL620A"
//! ref_id = "yl620a"
//! kind = "vfd"
//! profile = "yl620a"
//! modbus_address = 1
//! ```

use serde::{Deserialize, Serialize};
use spindle_common::config::{ConfigError, ConfigLoader, SharedConfig};
use spindle_common::spindle::config::{DriveConfig, SelectConfig, VfdConfig};
use spindle_common::spindle::types::SpindleKind;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Largest number of drives: ids must fit the persisted `i8`.
pub const MAX_DRIVES: usize = i8::MAX as usize;

/// Complete spindle HAL configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpindleHalConfig {
    /// Logging and instance name.
    pub shared: SharedConfig,

    /// Binding table.
    #[serde(default)]
    pub select: SelectConfig,

    /// VFD transport and scaling.
    #[serde(default)]
    pub vfd: VfdConfig,

    /// Physical drives in registration order.
    #[serde(default)]
    pub drives: Vec<DriveConfig>,
}

impl SpindleHalConfig {
    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {:?}", path);
        let config = Self::load(path)?;
        config.validate()?;
        info!(
            "Loaded config '{}': {} drives, {} selectable slots",
            config.shared.service_name,
            config.drives.len(),
            config.select.selectable_slots
        );
        Ok(config)
    }

    /// Validate every section and cross-section references.
    ///
    /// # Validation Rules
    /// 1. Sections valid on their own
    /// 2. `1 <= drives.len() <= MAX_DRIVES`
    /// 3. `select.default_spindle` names a configured drive
    /// 4. Modbus unit addresses unique
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.select.validate()?;
        self.vfd.validate()?;

        if self.drives.is_empty() || self.drives.len() > MAX_DRIVES {
            return Err(ConfigError::ValidationError(format!(
                "drives must list 1..={} entries (got {})",
                MAX_DRIVES,
                self.drives.len()
            )));
        }

        let mut units = HashSet::new();
        for (idx, drive) in self.drives.iter().enumerate() {
            drive.validate(idx)?;
            if drive.kind == SpindleKind::Vfd {
                if let Some(unit) = drive.modbus_address {
                    if !units.insert(unit) {
                        return Err(ConfigError::ValidationError(format!(
                            "drives[{idx}] '{}': modbus_address {} already used",
                            drive.name, unit
                        )));
                    }
                }
            }
        }

        if self.select.default_spindle.index() >= self.drives.len() {
            return Err(ConfigError::ValidationError(format!(
                "select.default_spindle {} is not a configured drive",
                self.select.default_spindle
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_common::spindle::config::VfdProfile;
    use spindle_common::spindle::types::{SpindleId, SpindleRef};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[shared]
service_name = "spindle-test"
log_level = "debug"

[select]
default_spindle = 0
slot_defaults = ["yl620a", "gs20"]
max_tool_id = 99

[vfd]
retries = 5
at_speed_tolerance = 5.0

[[drives]]
name = "PWM"
ref_id = "pwm"
kind = "basic"

[[drives]]
name = "YL620A"
ref_id = "yl620a"
kind = "vfd"
profile = "yl620a"
modbus_address = 1

[[drives]]
name = "GS20"
ref_id = "gs20"
kind = "vfd"
profile = "gs20"
modbus_address = 2
"#;

    #[test]
    fn parse_full_config() {
        let config = SpindleHalConfig::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.select.slot_default(1), SpindleRef::Yl620a);
        assert_eq!(config.select.max_tool_id, Some(99));
        assert_eq!(config.vfd.retries, 5);
        assert_eq!(config.vfd.poll_interval_ms, 100);
        assert_eq!(config.drives[2].profile, Some(VfdProfile::Gs20));
    }

    #[test]
    fn load_validated_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = SpindleHalConfig::load_validated(file.path()).unwrap();
        assert_eq!(config.drives.len(), 3);
    }

    #[test]
    fn duplicate_modbus_address_rejected() {
        let mut config = SpindleHalConfig::from_toml(SAMPLE).unwrap();
        config.drives[2].modbus_address = Some(1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("already used")
        ));
    }

    #[test]
    fn default_spindle_must_exist() {
        let mut config = SpindleHalConfig::from_toml(SAMPLE).unwrap();
        config.select.default_spindle = SpindleId(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let text = format!("{SAMPLE}\n[extra]\nvalue = 1\n");
        assert!(matches!(
            SpindleHalConfig::from_toml(&text),
            Err(ConfigError::ParseError(_))
        ));
    }
}
