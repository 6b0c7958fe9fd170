use thiserror::Error;

use crate::cache::GenerationId;

/// The request produced no response at all.
///
/// A response with an error status is not a `FetchError`; it is returned to
/// the caller like any other response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network unreachable for {url}: {reason}")]
    NetworkUnreachable { url: String, reason: String },
}

impl FetchError {
    pub fn unreachable(url: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::NetworkUnreachable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// A generation rollover did not complete. The previous generation is still
/// active when this is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("generation {generation}: failed to cache {asset}: {reason}")]
    ManifestPopulationFailed {
        generation: GenerationId,
        asset: String,
        reason: String,
    },

    #[error("generation {0}: manifest is empty")]
    EmptyManifest(GenerationId),
}
