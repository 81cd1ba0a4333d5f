//! Метки типов бинарного формата документов.
//!
//! Каждое значение в документе предваряется однобайтовой меткой,
//! определяющей кодировку полезной нагрузки: фиксированный размер
//! (boolean, int32, int64) либо префикс длины (string, document,
//! array). Набор закрыт, но расширяем без перестройки модуля.

use std::fmt;

/// Однобайтовый дискриминатор типа значения на проводе.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Boolean = 0x08,
    Int32 = 0x10,
    Int64 = 0x12,
}

impl Tag {
    /// Восстанавливает метку из байта провода. Нулевой байт — это
    /// терминатор документа, а не метка, поэтому здесь он не известен.
    pub fn from_byte(byte: u8) -> Option<Tag> {
        match byte {
            0x02 => Some(Tag::String),
            0x03 => Some(Tag::Document),
            0x04 => Some(Tag::Array),
            0x08 => Some(Tag::Boolean),
            0x10 => Some(Tag::Int32),
            0x12 => Some(Tag::Int64),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::String => "string",
            Tag::Document => "document",
            Tag::Array => "array",
            Tag::Boolean => "boolean",
            Tag::Int32 => "int32",
            Tag::Int64 => "int64",
        };
        f.write_str(name)
    }
}
