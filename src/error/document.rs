use thiserror::Error;

use crate::{codec::types::Tag, error::DecodeError};

/// Ошибки многоуровневого поиска по документу.
///
/// Путь хранится целиком; `depth` — индекс ключа (с нуля), на котором
/// разрешение остановилось.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("key not found at depth {depth}: {}", .path.join("."))]
    KeyNotFound { path: Vec<String>, depth: usize },

    #[error("value at depth {depth} of {} is {actual}, not a document", .path.join("."))]
    NotADocument {
        path: Vec<String>,
        depth: usize,
        actual: Tag,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
