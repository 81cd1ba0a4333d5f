//! Представления документа: упорядоченное, неупорядоченное,
//! индексированное и ленивое.

pub mod d;
pub mod document;
pub mod m;
pub mod raw;
pub mod value;

pub use d::{D, DocElem};
pub use document::{Document, DocumentCodec, Element};
pub use m::M;
pub use raw::{RawD, RawDCodec, RawElem, RawValue};
pub use value::Value;
