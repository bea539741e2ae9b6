use tracing::Level;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `EnvFilter` directives, e.g. `warn,watchtower=debug`.
    pub filter: String,
    /// Events at or above this level are written to stderr instead of stdout.
    /// `None` keeps everything on stdout.
    pub stderr_threshold: Option<Level>,
    pub format: Format,
}

impl Config {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            stderr_threshold: Some(Level::ERROR),
            format: Format::Text,
        }
    }
}
