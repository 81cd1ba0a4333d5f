//! Кодеки записей: структуры с известным на этапе компиляции набором
//! полей.
//!
//! Запись объявляет таблицу полей константой: имя на проводе и пара
//! функций чтения/записи, замкнутых на конкретное поле. Диспетчер по
//! ключу ищет сначала точное совпадение, затем совпадение без учёта
//! регистра ASCII — источники данных нередко расходятся в
//! капитализации ключей. Судьбу ключей вне таблицы задаёт политика
//! `UnknownFields`.

use std::{marker::PhantomData, sync::Arc};

use tracing::trace;

use crate::{
    codec::{
        container::{decode_any, AnyValue},
        reader::Reader,
        registry::{Codec, Registry},
        writer::Writer,
    },
    document::D,
    error::{DecodeError, EncodeError},
};

/// Политика обработки ключей, которых нет в таблице полей записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Пропустить значение и продолжить.
    #[default]
    Ignore,
    /// Прервать декодирование ошибкой.
    Reject,
    /// Передать пару в `Record::capture_unknown`.
    Capture,
}

/// Одно поле записи: имя на проводе и доступ к полю через пару
/// функций. Функции не замыкают окружение и живут в константной
/// таблице.
pub struct Field<T> {
    pub name: &'static str,
    pub rename: Option<&'static str>,
    pub decode: fn(&mut T, &Arc<Registry>, &mut Reader<'_>) -> Result<(), DecodeError>,
    pub encode: fn(&T, &Arc<Registry>, &mut Writer) -> Result<(), EncodeError>,
}

impl<T> Field<T> {
    /// Имя поля на проводе: переименование, если задано, иначе имя
    /// поля.
    pub fn wire_key(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }
}

/// Структура, декодируемая из документа по таблице полей.
///
/// Декодер начинает с `Default::default()` и заполняет поля по мере
/// чтения; отсутствующие на проводе поля остаются значениями по
/// умолчанию.
pub trait Record: Default + Send + Sync + 'static {
    const FIELDS: &'static [Field<Self>];

    /// Принимает пару с неизвестным ключом при политике
    /// [`UnknownFields::Capture`]. По умолчанию пара отбрасывается.
    fn capture_unknown(&mut self, _key: String, _value: AnyValue<D>) {}
}

fn find_field<T: Record>(key: &str) -> Option<&'static Field<T>> {
    T::FIELDS
        .iter()
        .find(|field| field.wire_key() == key)
        .or_else(|| {
            T::FIELDS
                .iter()
                .find(|field| field.wire_key().eq_ignore_ascii_case(key))
        })
}

/// Кодек записи `T` с заданной политикой неизвестных ключей.
pub struct RecordCodec<T> {
    unknown: UnknownFields,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> RecordCodec<T> {
    pub fn new() -> Self {
        Self::with_policy(UnknownFields::default())
    }

    pub fn with_policy(unknown: UnknownFields) -> Self {
        RecordCodec {
            unknown,
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Default for RecordCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Codec for RecordCodec<T> {
    type Value = T;

    fn decode(
        &self,
        registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<T, DecodeError> {
        reader.read_document()?;
        let mut out = T::default();
        while let Some(key) = reader.read_element()? {
            match find_field::<T>(&key) {
                Some(field) => (field.decode)(&mut out, registry, reader)?,
                None => match self.unknown {
                    UnknownFields::Ignore => {
                        trace!(%key, "skipping unknown key");
                        reader.skip()?;
                    }
                    UnknownFields::Reject => {
                        return Err(DecodeError::UnknownKey { key });
                    }
                    UnknownFields::Capture => {
                        let value = decode_any::<D>(reader)?;
                        out.capture_unknown(key, value);
                    }
                },
            }
        }
        Ok(out)
    }

    fn encode(
        &self,
        registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &T,
    ) -> Result<(), EncodeError> {
        writer.write_document()?;
        for field in T::FIELDS {
            writer.write_element(field.wire_key())?;
            (field.encode)(value, registry, writer)?;
        }
        writer.write_end_document()
    }
}

/// Строит [`Field`] для именованного поля записи. Второй аргумент
/// задаёт имя на проводе, если оно отличается от имени поля.
#[macro_export]
macro_rules! record_field {
    ($record:ty, $field:ident) => {
        $crate::record_field!(@build $record, $field, None)
    };
    ($record:ty, $field:ident, $wire:literal) => {
        $crate::record_field!(@build $record, $field, Some($wire))
    };
    (@build $record:ty, $field:ident, $rename:expr) => {
        $crate::codec::record::Field::<$record> {
            name: stringify!($field),
            rename: $rename,
            decode: |record, registry, reader| {
                record.$field = registry.decode_value(reader)?;
                Ok(())
            },
            encode: |record, registry, writer| registry.encode_value(writer, &record.$field),
        }
    };
}
