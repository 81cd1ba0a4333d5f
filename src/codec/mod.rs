//! Потоковые кодеки бинарного формата документов: метки типов,
//! читатель, писатель и реестр диспетчеризации по типам.

pub mod container;
pub mod primitives;
pub mod reader;
pub mod record;
pub mod registry;
pub mod types;
pub mod writer;

pub use container::{AnyValue, Container, ContainerCodec, MapCodec};
pub use primitives::{BooleanCodec, Int32Codec, Int64Codec, StringCodec};
pub use reader::{Reader, MAX_DOCUMENT_DEPTH};
pub use record::{Field, Record, RecordCodec, UnknownFields};
pub use registry::{from_reader, from_slice, global, to_vec, Codec, Registry};
pub use types::Tag;
pub use writer::Writer;
