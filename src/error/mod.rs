pub mod decode;
pub mod document;
pub mod encode;

pub use decode::DecodeError;
pub use document::DocumentError;
pub use encode::EncodeError;
