/// Crate-wide result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] lightning_store::Error),

    #[error(transparent)]
    Plugin(#[from] lightning_plugin::Error),

    /// `Lightning::run` was called while another run loop owns the event stream.
    #[error("event loop is already running")]
    AlreadyRunning,
}
