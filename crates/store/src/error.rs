use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("empty remote id for platform {platform}")]
    EmptyRemoteId { platform: String },
}

impl Error {
    #[must_use]
    pub fn empty_remote_id(platform: impl Into<String>) -> Self {
        Self::EmptyRemoteId {
            platform: platform.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
