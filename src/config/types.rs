// Configuration types module
// Defines the settings consumed by the renderer, decoder, pagination and logger

use serde::{Deserialize, Serialize};

use crate::http::ContentType;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Format used when the `Accept` header names nothing we can produce
    #[serde(default = "default_content_type")]
    pub default_content_type: ContentType,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[allow(clippy::missing_const_for_fn)]
fn default_content_type() -> ContentType {
    ContentType::Json
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_content_type: default_content_type(),
            pagination: PaginationConfig::default(),
            decode: DecodeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Pagination configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Query parameter carrying the current page
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Query parameter carrying the page size
    #[serde(default = "default_per_page_param")]
    pub per_page_param: String,
    /// Page size used when the request does not name a valid one
    #[serde(default = "default_per_page")]
    pub per_page_default: u64,
    /// Emit pagination metadata as headers (true) or as a body envelope (false)
    #[serde(default = "default_in_header")]
    pub in_header: bool,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_per_page_param() -> String {
    "per_page".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_per_page() -> u64 {
    25
}

#[allow(clippy::missing_const_for_fn)]
fn default_in_header() -> bool {
    true
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_param: default_page_param(),
            per_page_param: default_per_page_param(),
            per_page_default: default_per_page(),
            in_header: default_in_header(),
        }
    }
}

/// Request body decoding configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Largest request body the decoder will read, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_body_size() -> u64 {
    10_485_760 // 10MB
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    #[serde(default = "default_level")]
    pub level: String,
    /// Line format: plain or json
    #[serde(default = "default_format")]
    pub format: String,
    /// Info log file path (optional, stdout if not set)
    #[serde(default)]
    pub info_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "plain".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            info_log_file: None,
            error_log_file: None,
        }
    }
}
