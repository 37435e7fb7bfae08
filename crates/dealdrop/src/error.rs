use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::Error as SerdeError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DealdropError {
    #[error("API error: `{0}`")]
    Api(String),
    #[error("Telegram error: `{0}`")]
    Telegram(String),
    #[error("Database error: `{0}`")]
    Db(#[from] DbErr),
    #[error("HTTP error: `{0}`")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: `{0}`")]
    Io(#[from] io::Error),
    #[error("Figment error: `{0}`")]
    Figment(#[from] figment::Error),
    #[error("URL parse error: `{0}`")]
    UrlParse(#[from] url::ParseError),
    #[error("Serialization/deserialization error")]
    Serde(#[from] SerdeError),
}

impl IntoResponse for DealdropError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        let status = match self {
            DealdropError::Api(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DealdropError>;
