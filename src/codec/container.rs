//! Обобщённое декодирование документов в контейнеры "ключ — любое
//! значение".
//!
//! Формат самоописываемый: метка перед значением говорит, что читать,
//! поэтому документ можно разобрать, не зная схемы. `AnyValue` —
//! замкнутое множество таких значений; параметр `C` задаёт, чем
//! представлен вложенный документ. Разные контейнеры расходятся только
//! в правилах вставки (порядок, дубликаты), и это ровно то, что
//! абстрагирует трейт `Container`.

use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use crate::{
    codec::{
        reader::Reader,
        registry::{Codec, Registry},
        types::Tag,
        writer::Writer,
    },
    error::{DecodeError, EncodeError},
};

/// Значение произвольного типа из документа.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue<C> {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    String(String),
    Container(C),
}

impl<C> From<bool> for AnyValue<C> {
    fn from(value: bool) -> Self {
        AnyValue::Boolean(value)
    }
}

impl<C> From<i32> for AnyValue<C> {
    fn from(value: i32) -> Self {
        AnyValue::Int32(value)
    }
}

impl<C> From<i64> for AnyValue<C> {
    fn from(value: i64) -> Self {
        AnyValue::Int64(value)
    }
}

impl<C> From<&str> for AnyValue<C> {
    fn from(value: &str) -> Self {
        AnyValue::String(value.to_string())
    }
}

impl<C> From<String> for AnyValue<C> {
    fn from(value: String) -> Self {
        AnyValue::String(value)
    }
}

/// Контейнер пар "ключ — значение", заполняемый при декодировании и
/// обходимый при кодировании.
pub trait Container: Sized + 'static {
    /// Пустой контейнер под вложенный или верхнеуровневый документ.
    fn empty() -> Self;

    /// Принимает очередную пару с провода. Политика дубликатов — дело
    /// контейнера.
    fn insert(&mut self, key: String, value: AnyValue<Self>);

    /// Пары в порядке, в котором контейнер хочет видеть их на проводе.
    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a str, &'a AnyValue<Self>)> + 'a>;
}

/// Читает значение, на котором позиционирован читатель, по его метке.
pub fn decode_any<C: Container>(reader: &mut Reader<'_>) -> Result<AnyValue<C>, DecodeError> {
    match reader.value_type() {
        Tag::Boolean => Ok(AnyValue::Boolean(reader.read_boolean()?)),
        Tag::Int32 => Ok(AnyValue::Int32(reader.read_i32()?)),
        Tag::Int64 => Ok(AnyValue::Int64(reader.read_i64()?)),
        Tag::String => Ok(AnyValue::String(reader.read_string()?)),
        Tag::Document => Ok(AnyValue::Container(decode_container(reader)?)),
        tag @ Tag::Array => Err(DecodeError::UnsupportedType { tag }),
    }
}

/// Читает документ целиком в контейнер.
pub fn decode_container<C: Container>(reader: &mut Reader<'_>) -> Result<C, DecodeError> {
    reader.read_document()?;
    let mut out = C::empty();
    while let Some(key) = reader.read_element()? {
        out.insert(key, decode_any(reader)?);
    }
    Ok(out)
}

/// Записывает значение в текущую позицию писателя.
pub fn encode_any<C: Container>(
    writer: &mut Writer,
    value: &AnyValue<C>,
) -> Result<(), EncodeError> {
    match value {
        AnyValue::Boolean(b) => writer.write_boolean(*b),
        AnyValue::Int32(i) => writer.write_i32(*i),
        AnyValue::Int64(i) => writer.write_i64(*i),
        AnyValue::String(s) => writer.write_string(s),
        AnyValue::Container(c) => encode_container(writer, c),
    }
}

/// Записывает контейнер как документ.
pub fn encode_container<C: Container>(writer: &mut Writer, container: &C) -> Result<(), EncodeError> {
    writer.write_document()?;
    for (key, value) in container.entries() {
        writer.write_element(key)?;
        encode_any(writer, value)?;
    }
    writer.write_end_document()
}

/// Кодек любого контейнера.
pub struct ContainerCodec<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C> ContainerCodec<C> {
    pub fn new() -> Self {
        ContainerCodec {
            _marker: PhantomData,
        }
    }
}

impl<C> Default for ContainerCodec<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Container> Codec for ContainerCodec<C> {
    type Value = C;

    fn decode(
        &self,
        _registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<C, DecodeError> {
        decode_container(reader)
    }

    fn encode(
        &self,
        _registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &C,
    ) -> Result<(), EncodeError> {
        encode_container(writer, value)
    }
}

/// Кодек `HashMap<String, V>` с однородными значениями. Кодек `V`
/// разрешается через реестр на каждом элементе, поэтому карта работает
/// и с пользовательскими типами значений. Дубликат ключа затирает
/// предыдущее значение.
pub struct MapCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> MapCodec<V> {
    pub fn new() -> Self {
        MapCodec {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for MapCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: 'static> Codec for MapCodec<V> {
    type Value = HashMap<String, V>;

    fn decode(
        &self,
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<HashMap<String, V>, DecodeError> {
        reader.read_document()?;
        let mut out = HashMap::new();
        while let Some(key) = reader.read_element()? {
            out.insert(key, registry.decode_value::<V>(reader)?);
        }
        Ok(out)
    }

    fn encode(
        &self,
        registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &HashMap<String, V>,
    ) -> Result<(), EncodeError> {
        writer.write_document()?;
        for (key, item) in value {
            writer.write_element(key)?;
            registry.encode_value(writer, item)?;
        }
        writer.write_end_document()
    }
}
