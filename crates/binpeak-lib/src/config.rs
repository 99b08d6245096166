use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::signal::SampleWidth;

pub const DEFAULT_REFERENCE_CHANNEL: &str = "bay_1_left_VL.bin";

/// Maps channel (file) names to decode widths and names the channel that
/// peak detection runs on.
///
/// ```toml
/// reference = "bay_1_left_VL.bin"
/// default_width = "u16"
///
/// [widths]
/// "samples.bin" = "u32"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub reference: String,
    pub default_width: SampleWidth,
    pub widths: BTreeMap<String, SampleWidth>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        let mut widths = BTreeMap::new();
        widths.insert("samples.bin".to_string(), SampleWidth::U32);
        Self {
            reference: DEFAULT_REFERENCE_CHANNEL.to_string(),
            default_width: SampleWidth::U16,
            widths,
        }
    }
}

impl ChannelConfig {
    /// Exact, case-sensitive lookup; unknown names use `default_width`.
    pub fn width_for(&self, name: &str) -> SampleWidth {
        self.widths
            .get(name)
            .copied()
            .unwrap_or(self.default_width)
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
