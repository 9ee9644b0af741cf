use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// The caller passed something that cannot be turned into package names.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The registry batch query failed; nothing from the batch is returned.
    #[error("Registry lookup failed: {0:#}")]
    LookupFailed(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
