//! Документ с индексом ключей.
//!
//! Элементы хранятся в порядке провода, рядом живёт отсортированная по
//! байтам ключей перестановка их позиций. Поиск по ключу — двоичный,
//! порядок записи при этом не трогается. Индекс поддерживается
//! инкрементально на каждой правке; перестроек с нуля нет.

use std::io::{Read, Write};

use tracing::trace;

use crate::{
    codec::{reader::Reader, registry::Codec, registry::Registry, types::Tag, writer::Writer},
    document::Value,
    error::{DecodeError, DocumentError, EncodeError},
};

/// Пара "ключ — значение" документа.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    key: String,
    value: Value,
}

impl Element {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Element {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Упорядоченный документ с двоичным поиском по ключу.
///
/// Дубликаты ключей допустимы: `get` возвращает первое вхождение в
/// порядке документа, `set` правит его же.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    elems: Vec<Element>,
    // позиции elems, отсортированные по байтам ключей
    index: Vec<usize>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Элементы в порядке провода.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    /// Нижняя граница ключа в индексе.
    fn index_floor(&self, key: &str) -> usize {
        self.index
            .partition_point(|&pos| self.elems[pos].key.as_bytes() < key.as_bytes())
    }

    /// Позиция первого вхождения ключа в порядке документа.
    fn position_of(&self, key: &str) -> Option<usize> {
        let floor = self.index_floor(key);
        self.index[floor..]
            .iter()
            .take_while(|&&pos| self.elems[pos].key == key)
            .copied()
            .min()
    }

    /// Первое вхождение ключа в порядке документа.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position_of(key).map(|pos| &self.elems[pos].value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position_of(key).is_some()
    }

    /// Добавляет элемент в конец, дубликат ключа допустим.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let elem = Element::new(key, value);
        let at = self.index_floor(&elem.key);
        self.index.insert(at, self.elems.len());
        self.elems.push(elem);
    }

    /// Добавляет элемент в начало документа.
    pub fn prepend(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let elem = Element::new(key, value);
        for pos in &mut self.index {
            *pos += 1;
        }
        let at = self.index_floor(&elem.key);
        self.index.insert(at, 0);
        self.elems.insert(0, elem);
    }

    /// Замещает значение первого вхождения ключа либо добавляет
    /// элемент в конец.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        match self.position_of(&key) {
            Some(pos) => self.elems[pos].value = value.into(),
            None => self.append(key, value),
        }
    }

    /// Удаляет первое вхождение ключа. Возвращает его значение.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        let pos = self.position_of(key)?;
        let at = match self.index.iter().position(|&p| p == pos) {
            Some(at) => at,
            None => return None, // индекс всегда содержит pos
        };
        self.index.remove(at);
        for p in &mut self.index {
            if *p > pos {
                *p -= 1;
            }
        }
        Some(self.elems.remove(pos).value)
    }

    /// Многоуровневый поиск: каждый ключ пути, кроме последнего,
    /// должен вести во вложенный документ.
    pub fn lookup(&self, path: &[&str]) -> Result<Value, DocumentError> {
        self.lookup_at(path, 0)
    }

    fn lookup_at(&self, path: &[&str], depth: usize) -> Result<Value, DocumentError> {
        let owned = || path.iter().map(|s| s.to_string()).collect();
        let key = match path.get(depth) {
            Some(key) => *key,
            None => {
                return Err(DocumentError::KeyNotFound {
                    path: owned(),
                    depth,
                })
            }
        };
        let value = match self.get(key) {
            Some(value) => value,
            None => {
                return Err(DocumentError::KeyNotFound {
                    path: owned(),
                    depth,
                })
            }
        };
        if depth + 1 == path.len() {
            return Ok(value.clone());
        }
        match value.tag() {
            Tag::Document => value.document()?.lookup_at(path, depth + 1),
            actual => Err(DocumentError::NotADocument {
                path: owned(),
                depth,
                actual,
            }),
        }
    }

    pub(crate) fn read_body(reader: &mut Reader<'_>) -> Result<Document, DecodeError> {
        reader.read_document()?;
        let mut doc = Document::new();
        while let Some(key) = reader.read_element()? {
            let tag = reader.value_type();
            let data = reader.read_bytes()?;
            doc.append(key, Value::from_raw(tag, data));
        }
        trace!(len = doc.len(), "document decoded");
        Ok(doc)
    }

    pub(crate) fn write_body(&self, writer: &mut Writer) -> Result<(), EncodeError> {
        writer.write_document()?;
        for elem in &self.elems {
            writer.write_element(&elem.key)?;
            writer.write_raw(elem.value.tag(), elem.value.data())?;
        }
        writer.write_end_document()
    }

    /// Разбирает документ из среза байтов.
    pub fn from_slice(bytes: &[u8]) -> Result<Document, DecodeError> {
        let mut reader = Reader::from_slice(bytes)?;
        Self::read_body(&mut reader)
    }

    /// Разбирает документ из потокового источника.
    pub fn read_from(source: impl Read) -> Result<Document, DecodeError> {
        let mut reader = Reader::new(source)?;
        Self::read_body(&mut reader)
    }

    /// Кодирует документ в вектор.
    pub fn to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::new();
        self.write_body(&mut writer)?;
        writer.into_vec()
    }

    /// Кодирует документ в приёмник. Возвращает число записанных байт.
    pub fn write(&self, sink: &mut impl Write) -> Result<usize, EncodeError> {
        let mut writer = Writer::new();
        self.write_body(&mut writer)?;
        writer.write_to(sink)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elems.iter()
    }
}

/// Кодек [`Document`] для реестра.
#[derive(Debug, Default)]
pub struct DocumentCodec;

impl Codec for DocumentCodec {
    type Value = Document;

    fn decode(
        &self,
        _registry: &std::sync::Arc<Registry>,
        reader: &mut Reader<'_>,
    ) -> Result<Document, DecodeError> {
        Document::read_body(reader)
    }

    fn encode(
        &self,
        _registry: &std::sync::Arc<Registry>,
        writer: &mut Writer,
        value: &Document,
    ) -> Result<(), EncodeError> {
        value.write_body(writer)
    }
}
