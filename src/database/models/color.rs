use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maps a word found in product names to a color group.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ColorMapping {
    pub palavra: String,
    pub grupo_cor: String,
}
