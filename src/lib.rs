/// Потоковые кодеки: метки типов, читатель, писатель, реестр.
pub mod codec;
/// Представления документа: D, M, Document, RawD.
pub mod document;
/// Ошибки декодирования, кодирования и поиска по документу.
pub mod error;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Кодеки и точки входа кодирования/декодирования.
pub use codec::{
    from_reader, from_slice, global, to_vec, AnyValue, BooleanCodec, Codec, Container,
    ContainerCodec, Field, Int32Codec, Int64Codec, MapCodec, Reader, Record, RecordCodec,
    Registry, StringCodec, Tag, UnknownFields, Writer, MAX_DOCUMENT_DEPTH,
};
/// Представления документа и их кодеки.
pub use document::{
    D, DocElem, Document, DocumentCodec, Element, M, RawD, RawDCodec, RawElem, RawValue, Value,
};
/// Ошибки операций.
pub use error::{DecodeError, DocumentError, EncodeError};
