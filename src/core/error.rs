use thiserror::Error;

#[derive(Error, Debug)]
pub enum TacticsError {
    #[error("Agent not found: {0:?}")]
    AgentNotFound(crate::core::types::AgentId),

    #[error("Agent already registered: {0:?}")]
    DuplicateAgent(crate::core::types::AgentId),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TacticsError>;
