use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("invalid origin key '{0}': expected <platform>:<message id>")]
    InvalidOriginKey(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn invalid_origin_key(raw: impl Into<String>) -> Self {
        Self::InvalidOriginKey(raw.into())
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type LightningError = Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can wrap a bare message. Required by [`impl_context!`].
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Expands to a crate-local `Context` trait adding `.context()` and
/// `.with_context()` to `Result` and `Option`, producing the local `Error`
/// through [`FromMessage`].
///
/// ```ignore
/// // crates/migrations/src/error.rs
/// lightning_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let context = context.into();
                self.map_err(|e| <Error as $crate::FromMessage>::from_message(format!("{context}: {e}")))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|e| {
                    <Error as $crate::FromMessage>::from_message(format!("{}: {e}", f().into()))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
