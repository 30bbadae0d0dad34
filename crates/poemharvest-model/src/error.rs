use thiserror::Error;

/// Why a page's markup could not be turned into a poem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no metadata template found")]
    NoMetadataBlock,

    #[error("no <poem> body found")]
    NoPoemBody,
}
