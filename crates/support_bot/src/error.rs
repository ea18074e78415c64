use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupportError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("conversation {0} is already closed")]
    ConversationClosed(i32),
    #[error("conversation {0} not found")]
    ConversationNotFound(i32),
    #[error("http error: {0}")]
    Http(reqwest::Error),
    #[error("transport error: {0}")]
    Transport(String),
}

pub type SupportResult<T> = std::result::Result<T, SupportError>;
