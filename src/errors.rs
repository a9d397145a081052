use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum StewardError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(steward::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(steward::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(steward::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(steward::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("HTTP client error: {0}")]
    #[diagnostic(code(steward::http))]
    Http(#[from] reqwest::Error),

    #[error("Invalid parameter: {0}")]
    #[diagnostic(code(steward::invalid_parameter))]
    InvalidParameter(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(steward::not_found))]
    NotFound(String),

    #[error("Forbidden: {0}")]
    #[diagnostic(code(steward::forbidden))]
    Forbidden(String),

    #[error("Unavailable: {0}")]
    #[diagnostic(code(steward::unavailable))]
    Unavailable(String),

    #[error("WeChat API error {code}: {message}")]
    #[diagnostic(code(steward::remote_api))]
    RemoteApi { code: i64, message: String },

    #[error("{0}")]
    #[diagnostic(code(steward::other))]
    Other(String),
}

impl StewardError {
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        StewardError::RemoteApi {
            code,
            message: message.into(),
        }
    }
}
