use thiserror::Error;

/// Ошибки построения бинарного документа.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("not positioned on an element")]
    NotElement,

    #[error("not positioned on a value")]
    NotValue,

    #[error("value written without a pending element name")]
    NoPendingKey,

    #[error("document ended while element name {key:?} is pending")]
    KeyPending { key: String },

    #[error("no open document")]
    NoOpenDocument,

    #[error("{open} document(s) still open")]
    UnfinishedDocument { open: usize },

    #[error("element name contains NUL: {key:?}")]
    InvalidKey { key: String },

    #[error("document depth limit exceeded: {current} > {max}")]
    DepthLimit { current: usize, max: usize },

    #[error("no codec registered for type {type_name}")]
    NoCodec { type_name: &'static str },

    #[error("codec for {type_name} received a value of a different type")]
    ValueTypeMismatch { type_name: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
