use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgError {
    #[error("plugin discovery failed in {source_id}: {cause}")]
    Discovery { source_id: String, cause: String },

    #[error("duplicate plugin '{name}': registered by both {first} and {second}")]
    DuplicatePlugin {
        name: String,
        first: String,
        second: String,
    },

    #[error("plugin '{name}' failed to load: {cause}")]
    LoadFailure { name: String, cause: String },

    #[error("plugin '{name}' crashed: {cause}")]
    HandlerCrash { name: String, cause: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid plugin name '{0}': must be alphanumeric with '-' or '_' and not start with '-'")]
    InvalidPluginName(String),

    #[error("built-in command registered twice: {0}")]
    DuplicateBuiltin(String),

    #[error("home directory not found: set AG_HOME or HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AgError {
    pub fn discovery(source_id: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AgError::Discovery {
            source_id: source_id.into(),
            cause: cause.to_string(),
        }
    }

    pub fn load_failure(name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AgError::LoadFailure {
            name: name.into(),
            cause: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgError>;
