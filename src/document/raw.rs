//! `RawD` — ленивое представление документа.
//!
//! Верхний уровень разбирается на ключи и неразобранные значения;
//! каждое значение держит свои байты провода и ссылку на реестр,
//! которым было прочитано. Декодирование значения откладывается до
//! явного вызова `unmarshal`, поэтому пропуск ненужных полей ничего
//! не стоит.

use std::{fmt, sync::Arc};

use bytes::Bytes;

use crate::{
    codec::{reader::Reader, registry::Codec, registry::Registry, types::Tag, writer::Writer},
    error::{DecodeError, EncodeError},
};

/// Неразобранное значение: метка, байты нагрузки и реестр для
/// отложенного декодирования.
#[derive(Clone)]
pub struct RawValue {
    tag: Tag,
    data: Bytes,
    registry: Arc<Registry>,
}

impl RawValue {
    pub(crate) fn read(
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<RawValue, DecodeError> {
        let tag = reader.value_type();
        let data = reader.read_bytes()?;
        Ok(RawValue {
            tag,
            data,
            registry: Arc::clone(registry),
        })
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Байты нагрузки, как они лежали на проводе.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Декодирует значение запрошенным типом через сохранённый реестр.
    pub fn unmarshal<T: 'static>(&self) -> Result<T, DecodeError> {
        let mut reader = Reader::for_value(&self.data, self.tag)?;
        self.registry.decode_value(&mut reader)
    }
}

// реестр в сравнении и выводе не участвует
impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.data == other.data
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawValue")
            .field("tag", &self.tag)
            .field("data", &self.data)
            .finish()
    }
}

/// Элемент ленивого документа.
#[derive(Debug, Clone, PartialEq)]
pub struct RawElem {
    pub key: String,
    pub value: RawValue,
}

/// Ленивый документ: ключи разобраны, значения — нет.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawD(pub Vec<RawElem>);

impl RawD {
    pub fn new() -> Self {
        RawD(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Первое вхождение ключа в порядке документа.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.0
            .iter()
            .find(|elem| elem.key == key)
            .map(|elem| &elem.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawElem> {
        self.0.iter()
    }
}

/// Кодек [`RawD`] для реестра.
#[derive(Debug, Default)]
pub struct RawDCodec;

impl Codec for RawDCodec {
    type Value = RawD;

    fn decode(
        &self,
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<RawD, DecodeError> {
        reader.read_document()?;
        let mut doc = RawD::new();
        while let Some(key) = reader.read_element()? {
            let value = RawValue::read(registry, reader)?;
            doc.0.push(RawElem { key, value });
        }
        Ok(doc)
    }

    fn encode(
        &self,
        _registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &RawD,
    ) -> Result<(), EncodeError> {
        writer.write_document()?;
        for elem in &value.0 {
            writer.write_element(&elem.key)?;
            writer.write_raw(elem.value.tag(), elem.value.data())?;
        }
        writer.write_end_document()
    }
}
