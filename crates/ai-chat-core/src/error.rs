use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    Stream(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ChatError {
    /// Stable code for callers that branch on the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidConfig(_) => "INVALID_CONFIG",
            ChatError::InvalidInput(_) => "INVALID_INPUT",
            ChatError::Provider(_) => "PROVIDER_ERROR",
            ChatError::Stream(_) => "STREAM_ERROR",
            ChatError::Tool(_) => "TOOL_ERROR",
            ChatError::Json(_) => "JSON_ERROR",
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(error: serde_json::Error) -> Self {
        ChatError::Json(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
