//! Кодеки скалярных типов.
//!
//! Целочисленные кодеки не требуют точного совпадения метки: int64
//! принимает int32 с расширением, int32 принимает int64 с проверкой
//! переполнения. Источник данных нередко записывает маленькие числа
//! компактной меткой, и требовать от вызывающего кода знания точной
//! ширины на проводе было бы неудобно.

use std::sync::Arc;

use crate::{
    codec::{
        reader::Reader,
        registry::{Codec, Registry},
        types::Tag,
        writer::Writer,
    },
    error::{DecodeError, EncodeError},
};

/// Кодек `bool`.
#[derive(Debug, Default)]
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    type Value = bool;

    fn decode(
        &self,
        _registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<bool, DecodeError> {
        reader.read_boolean()
    }

    fn encode(
        &self,
        _registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &bool,
    ) -> Result<(), EncodeError> {
        writer.write_boolean(*value)
    }
}

/// Кодек `i32`. Значение int64 сужается с проверкой диапазона.
#[derive(Debug, Default)]
pub struct Int32Codec;

impl Codec for Int32Codec {
    type Value = i32;

    fn decode(
        &self,
        _registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<i32, DecodeError> {
        match reader.value_type() {
            Tag::Int32 => reader.read_i32(),
            Tag::Int64 => {
                let value = reader.read_i64()?;
                i32::try_from(value).map_err(|_| DecodeError::IntegerOverflow {
                    value,
                    target: "int32",
                })
            }
            actual => Err(DecodeError::ValueType {
                actual,
                requested: Tag::Int32,
            }),
        }
    }

    fn encode(
        &self,
        _registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &i32,
    ) -> Result<(), EncodeError> {
        writer.write_i32(*value)
    }
}

/// Кодек `i64`. Значение int32 расширяется без потерь.
#[derive(Debug, Default)]
pub struct Int64Codec;

impl Codec for Int64Codec {
    type Value = i64;

    fn decode(
        &self,
        _registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<i64, DecodeError> {
        match reader.value_type() {
            Tag::Int64 => reader.read_i64(),
            Tag::Int32 => Ok(i64::from(reader.read_i32()?)),
            actual => Err(DecodeError::ValueType {
                actual,
                requested: Tag::Int64,
            }),
        }
    }

    fn encode(
        &self,
        _registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &i64,
    ) -> Result<(), EncodeError> {
        writer.write_i64(*value)
    }
}

/// Кодек `String`.
#[derive(Debug, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn decode(
        &self,
        _registry: &Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<String, DecodeError> {
        reader.read_string()
    }

    fn encode(
        &self,
        _registry: &Arc<Registry>,
        writer: &mut Writer,
        value: &String,
    ) -> Result<(), EncodeError> {
        writer.write_string(value)
    }
}
