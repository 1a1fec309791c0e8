// Configuration module entry point
// Loads renderer settings from an optional file, the environment and defaults

mod types;

pub use types::{DecodeConfig, LoggingConfig, PaginationConfig, RenderConfig};

impl RenderConfig {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. Environment variables prefixed with `RENDER_`
    /// override file values, nested keys separated by `__`
    /// (e.g. `RENDER_PAGINATION__PER_PAGE_DEFAULT=50`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("RENDER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("default_content_type", "json")?
            .set_default("pagination.page_param", "page")?
            .set_default("pagination.per_page_param", "per_page")?
            .set_default("pagination.per_page_default", 25)?
            .set_default("pagination.in_header", true)?
            .set_default("decode.max_body_size", 10_485_760)? // 10MB
            .set_default("logging.level", "info")?
            .set_default("logging.format", "plain")?
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from an in-memory TOML document, with the same defaults
    pub fn from_toml_str(source: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        settings.try_deserialize()
    }
}
