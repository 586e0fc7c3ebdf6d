//! Error taxonomy
//!
//! Nothing here is fatal to a running game: callers log and carry on.

use thiserror::Error;

use crate::sim::{BlockId, VisualId};

#[derive(Debug, Error)]
pub enum GameError {
    /// Pick hit something that has no block behind it
    #[error("visual {0:?} is not mapped to any block")]
    UnknownVisual(VisualId),

    #[error("block {0:?} does not exist")]
    UnknownBlock(BlockId),

    /// Block model failed to load; the block keeps its slot but takes no part
    #[error("block {0:?} is missing (model failed to load)")]
    MissingBlock(BlockId),

    /// Already taken out of the tower this game
    #[error("block {0:?} has already been removed")]
    RemovedBlock(BlockId),

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),
}
