use thiserror::Error;

use crate::codec::types::Tag;

/// Ошибки разбора бинарного документа.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("positioned on {actual}, but attempted to read {requested}")]
    ValueType { actual: Tag, requested: Tag },

    #[error("not positioned on an element")]
    NotElement,

    #[error("not positioned on a value")]
    NotValue,

    #[error(
        "invalid document length at position {position}: declared {declared}, consumed {consumed}"
    )]
    InvalidDocumentLength {
        position: usize,
        declared: usize,
        consumed: usize,
    },

    #[error("invalid byte for boolean: {byte}")]
    InvalidBoolean { byte: u8 },

    #[error("string not terminated by NUL")]
    UnterminatedString,

    #[error("malformed {tag} value: {reason}")]
    MalformedValue { tag: Tag, reason: &'static str },

    #[error("unknown type tag 0x{byte:02x}")]
    InvalidTypeTag { byte: u8 },

    #[error("unexpected EOF at position {position}")]
    UnexpectedEof { position: usize },

    #[error("invalid UTF-8 in {what}")]
    InvalidUtf8 { what: &'static str },

    #[error("document depth limit exceeded: {current} > {max}")]
    DepthLimit { current: usize, max: usize },

    #[error("integer overflow: {value} does not fit into {target}")]
    IntegerOverflow { value: i64, target: &'static str },

    #[error("no codec registered for type {type_name}")]
    NoCodec { type_name: &'static str },

    #[error("unknown key {key:?}")]
    UnknownKey { key: String },

    #[error("unsupported type {tag} in this position")]
    UnsupportedType { tag: Tag },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("position {position}: {source}")]
    At {
        position: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Оборачивает ошибку текущим байтовым смещением. Уже обёрнутые
    /// ошибки не оборачиваются повторно.
    pub(crate) fn at(self, position: usize) -> DecodeError {
        match self {
            err @ DecodeError::At { .. } => err,
            err => DecodeError::At {
                position,
                source: Box::new(err),
            },
        }
    }

    /// Снимает обёртку со смещением, возвращая исходную ошибку.
    pub fn into_inner(self) -> DecodeError {
        match self {
            DecodeError::At { source, .. } => *source,
            err => err,
        }
    }
}
