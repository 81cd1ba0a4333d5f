//! Реестр кодеков и типизированные точки входа.
//!
//! Диспетчеризация по типу значения: каждый кодек регистрируется под
//! `TypeId` своего типа, стирание происходит через `ErasedCodec`.
//! Реестр наполняется при инициализации и затем замораживается в
//! `Arc` — после этого он разделяется между потоками без блокировок.
//! Глобальный реестр со стандартным набором кодеков подходит для
//! большинства вызовов; собственный нужен только ради кодеков
//! пользовательских типов.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    io::{Read, Write},
    sync::Arc,
};

use once_cell::sync::Lazy;
use tracing::error;

use crate::{
    codec::{
        container::{ContainerCodec, MapCodec},
        primitives::{BooleanCodec, Int32Codec, Int64Codec, StringCodec},
        reader::Reader,
        record::{Record, RecordCodec, UnknownFields},
        writer::Writer,
    },
    document::{DocumentCodec, RawDCodec, D, M},
    error::{DecodeError, EncodeError},
};

/// Кодек одного типа значений.
///
/// `decode` вызывается с читателем, позиционированным на значении, и
/// обязан поглотить его целиком. `encode` вызывается с писателем,
/// ожидающим значение после отложенного ключа (либо верхнеуровневый
/// документ). Реестр передаётся для рекурсивной диспетчеризации
/// вложенных значений.
pub trait Codec: Send + Sync + 'static {
    type Value: 'static;

    fn decode(
        &self,
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<Self::Value, DecodeError>;

    fn encode(
        &self,
        registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &Self::Value,
    ) -> Result<(), EncodeError>;
}

/// Стёртая форма кодека для хранения в одной таблице.
trait ErasedCodec: Send + Sync {
    fn decode_erased(
        &self,
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<Box<dyn Any>, DecodeError>;

    fn encode_erased(
        &self,
        registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &dyn Any,
    ) -> Result<(), EncodeError>;
}

impl<C: Codec> ErasedCodec for C {
    fn decode_erased(
        &self,
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<Box<dyn Any>, DecodeError> {
        Ok(Box::new(self.decode(registry, reader)?))
    }

    fn encode_erased(
        &self,
        registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &dyn Any,
    ) -> Result<(), EncodeError> {
        let value =
            value
                .downcast_ref::<C::Value>()
                .ok_or_else(|| EncodeError::ValueTypeMismatch {
                    type_name: std::any::type_name::<C::Value>(),
                })?;
        self.encode(registry, writer, value)
    }
}

/// Таблица кодеков, ключованная типом значения.
pub struct Registry {
    codecs: HashMap<TypeId, Arc<dyn ErasedCodec>>,
}

impl Registry {
    /// Пустой реестр без единого кодека.
    pub fn new() -> Self {
        Registry {
            codecs: HashMap::new(),
        }
    }

    /// Реестр со стандартным набором: скаляры, `D`, `M`, `Document`,
    /// `RawD` и карты строк на каждый из скаляров.
    pub fn with_defaults() -> Self {
        let mut reg = Registry::new();
        reg.register(BooleanCodec);
        reg.register(Int32Codec);
        reg.register(Int64Codec);
        reg.register(StringCodec);
        reg.register(ContainerCodec::<D>::new());
        reg.register(ContainerCodec::<M>::new());
        reg.register(DocumentCodec);
        reg.register(RawDCodec);
        reg.register_map::<bool>();
        reg.register_map::<i32>();
        reg.register_map::<i64>();
        reg.register_map::<String>();
        reg
    }

    /// Регистрирует кодек для его типа значения. Повторная регистрация
    /// замещает предыдущий кодек.
    pub fn register<C: Codec>(&mut self, codec: C) {
        self.codecs
            .insert(TypeId::of::<C::Value>(), Arc::new(codec));
    }

    /// Регистрирует кодек `HashMap<String, V>`. Кодек значения `V`
    /// разрешается через реестр в момент вызова.
    pub fn register_map<V: 'static>(&mut self) {
        self.register(MapCodec::<V>::new());
    }

    /// Регистрирует кодек записи со стандартной политикой неизвестных
    /// ключей.
    pub fn register_record<T: Record>(&mut self) {
        self.register(RecordCodec::<T>::new());
    }

    /// Регистрирует кодек записи с явной политикой неизвестных ключей.
    pub fn register_record_with<T: Record>(&mut self, unknown: UnknownFields) {
        self.register(RecordCodec::<T>::with_policy(unknown));
    }

    fn lookup(&self, id: TypeId) -> Option<&Arc<dyn ErasedCodec>> {
        self.codecs.get(&id)
    }

    /// Декодирует значение, на котором позиционирован читатель.
    pub fn decode_value<T: 'static>(
        self: &Arc<Self>,
        reader: &mut Reader<'_>,
    ) -> Result<T, DecodeError> {
        let type_name = std::any::type_name::<T>();
        let codec = match self.lookup(TypeId::of::<T>()) {
            Some(codec) => Arc::clone(codec),
            None => {
                error!(%type_name, "no codec registered");
                return Err(DecodeError::NoCodec { type_name });
            }
        };
        match codec.decode_erased(self, reader)?.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(DecodeError::NoCodec { type_name }),
        }
    }

    /// Кодирует значение в текущую позицию писателя.
    pub fn encode_value<T: 'static>(
        self: &Arc<Self>,
        writer: &mut Writer,
        value: &T,
    ) -> Result<(), EncodeError> {
        let type_name = std::any::type_name::<T>();
        let codec = match self.lookup(TypeId::of::<T>()) {
            Some(codec) => Arc::clone(codec),
            None => {
                error!(%type_name, "no codec registered");
                return Err(EncodeError::NoCodec { type_name });
            }
        };
        codec.encode_erased(self, writer, value)
    }

    /// Разбирает верхнеуровневый документ из среза байтов.
    pub fn decode_from_slice<T: 'static>(self: &Arc<Self>, bytes: &[u8]) -> Result<T, DecodeError> {
        let mut reader = Reader::from_slice(bytes)?;
        self.decode_value(&mut reader)
    }

    /// Разбирает верхнеуровневый документ из потокового источника.
    pub fn decode_from<T: 'static>(self: &Arc<Self>, source: impl Read) -> Result<T, DecodeError> {
        let mut reader = Reader::new(source)?;
        self.decode_value(&mut reader)
    }

    /// Кодирует значение как верхнеуровневый документ.
    pub fn encode_to_vec<T: 'static>(self: &Arc<Self>, value: &T) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::new();
        self.encode_value(&mut writer, value)?;
        writer.into_vec()
    }

    /// Кодирует значение как верхнеуровневый документ в приёмник.
    pub fn encode_to<T: 'static>(
        self: &Arc<Self>,
        sink: &mut impl Write,
        value: &T,
    ) -> Result<usize, EncodeError> {
        let mut writer = Writer::new();
        self.encode_value(&mut writer, value)?;
        writer.write_to(sink)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::with_defaults()));

/// Глобальный реестр со стандартным набором кодеков.
pub fn global() -> &'static Arc<Registry> {
    &GLOBAL
}

/// Разбирает документ из среза через глобальный реестр.
pub fn from_slice<T: 'static>(bytes: &[u8]) -> Result<T, DecodeError> {
    global().decode_from_slice(bytes)
}

/// Разбирает документ из потокового источника через глобальный реестр.
pub fn from_reader<T: 'static>(source: impl Read) -> Result<T, DecodeError> {
    global().decode_from(source)
}

/// Кодирует значение в вектор через глобальный реестр.
pub fn to_vec<T: 'static>(value: &T) -> Result<Vec<u8>, EncodeError> {
    global().encode_to_vec(value)
}
