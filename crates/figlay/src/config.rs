#![forbid(unsafe_code)]

//! Figure defaults as data.
//!
//! [`FigureConfig`] collects every default a new figure starts from, so a
//! host can keep them in a file instead of code.
//!
//! # Loading
//!
//! ```toml
//! # figlay.toml
//! figsize = [8.0, 6.0]
//! dpi = 150.0
//! constrained_layout = true
//!
//! [subplot]
//! left = 0.1
//! wspace = 0.3
//! ```
//!
//! ```rust,ignore
//! let config = FigureConfig::load("figlay.toml")?;
//! let fig = Figure::from_config(&config)?;
//! ```
//!
//! # Defaults
//!
//! `FigureConfig::default()` matches the built-in defaults exactly: a
//! 6.4 × 4.8 in figure at 100 dpi, the standard subplot margins and manual
//! layout.

#[cfg(feature = "config")]
use std::path::Path;

use figlay_core::KeyCollisionPolicy;
use figlay_layout::{ConstrainedPads, DEFAULT_EMPTY_SENTINEL, SubplotParams};
use serde::{Deserialize, Serialize};

/// Defaults applied to a new figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Width and height in inches.
    pub figsize: [f64; 2],
    /// Dots per inch.
    pub dpi: f64,
    /// Margins and spacing for grid-placed panels.
    pub subplot: SubplotParams,
    /// Pads used when constrained layout is enabled without explicit pads.
    pub constrained_pads: ConstrainedPads,
    /// Start in tight layout.
    pub autolayout: bool,
    /// Start in constrained layout.
    pub constrained_layout: bool,
    /// Placement-key collision handling.
    pub key_collision: KeyCollisionPolicy,
    /// Character marking an empty mosaic cell in text layouts.
    pub empty_sentinel: char,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            figsize: [6.4, 4.8],
            dpi: 100.0,
            subplot: SubplotParams::default(),
            constrained_pads: ConstrainedPads::default(),
            autolayout: false,
            constrained_layout: false,
            key_collision: KeyCollisionPolicy::default(),
            empty_sentinel: DEFAULT_EMPTY_SENTINEL.chars().next().unwrap_or('.'),
        }
    }
}

impl FigureConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, FigureConfigError> {
        toml::from_str(s).map_err(FigureConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, FigureConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FigureConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, FigureConfigError> {
        serde_json::from_str(s).map_err(FigureConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FigureConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FigureConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Load a file, picking the format from its extension (`.json` is JSON,
    /// anything else TOML), and validate the result.
    #[cfg(feature = "config")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FigureConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_file(path)?
        } else {
            Self::from_toml_file(path)?
        };
        let problems = config.validate();
        if problems.is_empty() {
            Ok(config)
        } else {
            Err(FigureConfigError::Invalid(problems))
        }
    }

    /// Check every value is usable.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let [width, height] = self.figsize;
        if !(width.is_finite() && width >= 0.0 && height.is_finite() && height >= 0.0) {
            errors.push(format!(
                "figsize must be finite and non-negative, got [{width}, {height}]"
            ));
        }
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            errors.push(format!("dpi must be positive, got {}", self.dpi));
        }
        if let Err(e) = self.subplot.validate() {
            errors.push(format!("subplot: {e}"));
        }

        let pads = &self.constrained_pads;
        for (name, value) in [
            ("w_pad", pads.w_pad),
            ("h_pad", pads.h_pad),
            ("wspace", pads.wspace),
            ("hspace", pads.hspace),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!(
                    "constrained_pads.{name} must be non-negative, got {value}"
                ));
            }
        }

        if self.autolayout && self.constrained_layout {
            errors.push("autolayout and constrained_layout cannot both be enabled".to_owned());
        }
        if self.empty_sentinel.is_whitespace() {
            errors.push("empty_sentinel cannot be whitespace".to_owned());
        }

        errors
    }
}

/// Errors that can occur when loading a figure configuration.
#[derive(Debug)]
pub enum FigureConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Invalid(Vec<String>),
}

impl std::fmt::Display for FigureConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Invalid(errors) => write!(f, "invalid configuration: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for FigureConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}
