use {lightning_common::FromMessage, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown schema version '{version}'")]
    InvalidVersion { version: String },

    #[error("no migration path from {from} to {to}")]
    NoMigrationPath { from: String, to: String },

    #[error("invalid migration step {from} -> {to}: {reason}")]
    InvalidStep {
        from: String,
        to: String,
        reason: String,
    },

    #[error("migration {step} failed on document {id}: {reason}")]
    TransformFailure {
        step: String,
        id: String,
        reason: String,
    },

    #[error("document in '{collection}' has no _id")]
    MissingId { collection: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Store(#[from] lightning_store::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    #[must_use]
    pub fn no_migration_path(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::NoMigrationPath {
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub fn invalid_step(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidStep {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transform_failure(
        step: impl Into<String>,
        id: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::TransformFailure {
            step: step.into(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

lightning_common::impl_context!();
