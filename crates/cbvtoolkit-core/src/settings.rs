//! Settings for cbvtoolkit applications.
//!
//! [`Settings`] holds the small amount of configuration the toolkit reads:
//! logging, the server bind address, template directories and CSV output
//! options. Every field has a default so a partial settings file is enough.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Template lookup configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Directories to search for template files, in order.
    pub dirs: Vec<PathBuf>,
}

/// Delimited-text output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSettings {
    /// Field delimiter. Must be a single ASCII character.
    pub delimiter: char,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvSettings {
    /// Returns the delimiter as the byte the CSV writer expects.
    ///
    /// Non-ASCII delimiters fall back to a comma.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b',')
    }
}

/// The complete set of toolkit settings.
///
/// # Examples
///
/// ```
/// use cbvtoolkit_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.log_level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled. Controls the log format.
    pub debug: bool,
    /// Tracing filter directive (e.g. "info", "cbvtoolkit_views=debug").
    pub log_level: String,
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Largest request body, in bytes, the server will read.
    pub max_body_size: usize,
    /// Template configuration.
    pub templates: TemplateSettings,
    /// CSV output configuration.
    pub csv: CsvSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1:8000".to_string(),
            max_body_size: 2_621_440,
            templates: TemplateSettings::default(),
            csv: CsvSettings::default(),
        }
    }
}
