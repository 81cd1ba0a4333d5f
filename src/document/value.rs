//! Значение элемента документа в байтах провода.
//!
//! `Value` хранит метку и точную полезную нагрузку значения, ничего не
//! разбирая заранее. Доступ к содержимому — через проверяемые методы:
//! запрос не той формы возвращает ошибку типа, а не панику. Нагрузка
//! лежит в `Bytes`, поэтому клонирование значения дёшево.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::{
    codec::types::Tag,
    document::Document,
    error::{DecodeError, EncodeError},
};

/// Метка и неразобранные байты одного значения.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    tag: Tag,
    data: Bytes,
}

impl Value {
    /// Собирает значение из метки и байтов нагрузки. Байты должны быть
    /// точной кодировкой значения этой метки.
    pub fn from_raw(tag: Tag, data: Bytes) -> Self {
        Value { tag, data }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Байты нагрузки, как они лежат на проводе.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn ensure(&self, requested: Tag) -> Result<(), DecodeError> {
        if self.tag != requested {
            return Err(DecodeError::ValueType {
                actual: self.tag,
                requested,
            });
        }
        Ok(())
    }

    pub fn boolean(&self) -> Result<bool, DecodeError> {
        self.ensure(Tag::Boolean)?;
        match self.data.first() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(&byte) => Err(DecodeError::InvalidBoolean { byte }),
            None => Err(DecodeError::MalformedValue {
                tag: Tag::Boolean,
                reason: "empty payload",
            }),
        }
    }

    pub fn int32(&self) -> Result<i32, DecodeError> {
        self.ensure(Tag::Int32)?;
        if self.data.len() != 4 {
            return Err(DecodeError::MalformedValue {
                tag: Tag::Int32,
                reason: "payload is not 4 bytes",
            });
        }
        Ok(LittleEndian::read_i32(&self.data))
    }

    pub fn int64(&self) -> Result<i64, DecodeError> {
        self.ensure(Tag::Int64)?;
        if self.data.len() != 8 {
            return Err(DecodeError::MalformedValue {
                tag: Tag::Int64,
                reason: "payload is not 8 bytes",
            });
        }
        Ok(LittleEndian::read_i64(&self.data))
    }

    /// Строка без копирования: срез нагрузки между префиксом длины и
    /// терминатором.
    pub fn string(&self) -> Result<&str, DecodeError> {
        self.ensure(Tag::String)?;
        if self.data.len() < 5 {
            return Err(DecodeError::MalformedValue {
                tag: Tag::String,
                reason: "payload shorter than length prefix and terminator",
            });
        }
        let declared = LittleEndian::read_i32(&self.data) as usize;
        if declared + 4 != self.data.len() {
            return Err(DecodeError::MalformedValue {
                tag: Tag::String,
                reason: "length prefix disagrees with payload size",
            });
        }
        if self.data[self.data.len() - 1] != 0 {
            return Err(DecodeError::UnterminatedString);
        }
        std::str::from_utf8(&self.data[4..self.data.len() - 1])
            .map_err(|_| DecodeError::InvalidUtf8 {
                what: "string value",
            })
    }

    /// Байты вложенного документа целиком, с префиксом длины и
    /// терминатором.
    pub fn document_bytes(&self) -> Result<&[u8], DecodeError> {
        self.ensure(Tag::Document)?;
        Ok(&self.data)
    }

    /// Разбирает вложенный документ.
    pub fn document(&self) -> Result<Document, DecodeError> {
        Document::from_slice(self.document_bytes()?)
    }

    /// Кодирует документ во вложенное значение.
    pub fn from_document(doc: &Document) -> Result<Value, EncodeError> {
        Ok(Value {
            tag: Tag::Document,
            data: Bytes::from(doc.to_vec()?),
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value {
            tag: Tag::Boolean,
            data: Bytes::from(vec![value as u8]),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value {
            tag: Tag::Int32,
            data: Bytes::from(value.to_le_bytes().to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value {
            tag: Tag::Int64,
            data: Bytes::from(value.to_le_bytes().to_vec()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        let mut data = Vec::with_capacity(4 + value.len() + 1);
        data.extend_from_slice(&(value.len() as i32 + 1).to_le_bytes());
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        Value {
            tag: Tag::String,
            data: Bytes::from(data),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::from(value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Каждый конструктор читается обратно своим методом доступа.
    #[test]
    fn test_accessors_round_trip() {
        assert!(Value::from(true).boolean().unwrap());
        assert_eq!(Value::from(7i32).int32().unwrap(), 7);
        assert_eq!(Value::from(-9i64).int64().unwrap(), -9);
        assert_eq!(Value::from("hi").string().unwrap(), "hi");
    }

    /// Строковая нагрузка кодируется как `длина ‖ utf8 ‖ NUL`.
    #[test]
    fn test_string_wire_bytes() {
        let value = Value::from("b");
        assert_eq!(value.tag(), Tag::String);
        assert_eq!(value.data(), &[0x02, 0x00, 0x00, 0x00, b'b', 0x00]);
    }

    /// Доступ не той формы — ошибка типа с обеими метками.
    #[test]
    fn test_type_mismatch() {
        let err = Value::from(1i32).boolean().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ValueType {
                actual: Tag::Int32,
                requested: Tag::Boolean,
            }
        ));
    }

    /// Битый префикс длины строки отлавливается методом доступа.
    #[test]
    fn test_corrupt_string_payload() {
        let value = Value::from_raw(
            Tag::String,
            Bytes::from(vec![0x05, 0x00, 0x00, 0x00, b'b', 0x00]),
        );
        assert!(matches!(
            value.string().unwrap_err(),
            DecodeError::MalformedValue { tag: Tag::String, .. }
        ));
    }

    /// Булево значение с байтом вне {0, 1} отвергается.
    #[test]
    fn test_invalid_boolean_byte() {
        let value = Value::from_raw(Tag::Boolean, Bytes::from(vec![2]));
        assert!(matches!(
            value.boolean().unwrap_err(),
            DecodeError::InvalidBoolean { byte: 2 }
        ));
    }
}
