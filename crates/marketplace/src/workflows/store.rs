/// Error enumeration shared by every repository seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Aggregates carrying an optimistic concurrency token.
pub trait Versioned {
    fn version(&self) -> u64;
    fn bump_version(&mut self);
}

/// Shared check-and-increment used by the in-memory stores.
pub fn check_version<T: Versioned>(
    stored: &T,
    expected_version: u64,
) -> Result<(), RepositoryError> {
    if stored.version() == expected_version {
        Ok(())
    } else {
        Err(RepositoryError::VersionMismatch {
            expected: expected_version,
            found: stored.version(),
        })
    }
}
