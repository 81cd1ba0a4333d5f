//! Потоковый разбор бинарных документов.
//!
//! `Reader` превращает источник байтов в последовательность типизированных
//! элементов. Для каждого открытого документа хранится кадр: смещение
//! начала и заявленная в 4-байтовом префиксе длина. Курсор различает два
//! состояния: «на элементе» (готов прочитать метку и ключ) и «на значении»
//! (готов прочитать полезную нагрузку). Конец документа — это ожидаемый
//! исход итерации (`Ok(None)`), а не ошибка; при его чтении заявленная
//! длина сверяется с фактически потреблёнными байтами.

use std::io::Read;

use bytes::Bytes;
use memchr::memchr;
use tracing::{error, trace};

use crate::{codec::types::Tag, error::DecodeError};

/// Максимальная вложенность документов (32 уровня).
pub const MAX_DOCUMENT_DEPTH: usize = 32;

const READ_CHUNK: usize = 512;

/// Буферизованный источник с упреждающим чтением и абсолютной позицией.
struct TrackingSource<'a> {
    inner: Box<dyn Read + 'a>,
    buf: Vec<u8>,
    start: usize,
    position: usize,
}

impl<'a> TrackingSource<'a> {
    fn new(inner: impl Read + 'a) -> Self {
        TrackingSource {
            inner: Box::new(inner),
            buf: Vec::with_capacity(READ_CHUNK),
            start: 0,
            position: 0,
        }
    }

    fn buffered(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Добирает данные из источника, пока в буфере не окажется `want` байт.
    fn fill(&mut self, want: usize) -> Result<(), DecodeError> {
        while self.buffered() < want {
            if self.start > 0 {
                self.buf.drain(..self.start);
                self.start = 0;
            }
            let mut chunk = [0u8; READ_CHUNK];
            let read = self.inner.read(&mut chunk)?;
            if read == 0 {
                return Err(DecodeError::UnexpectedEof {
                    position: self.position + self.buffered(),
                });
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    /// Показывает `count` байт, не потребляя их.
    fn peek(&mut self, count: usize) -> Result<&[u8], DecodeError> {
        self.fill(count)?;
        Ok(&self.buf[self.start..self.start + count])
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        self.fill(1)?;
        let byte = self.buf[self.start];
        self.start += 1;
        self.position += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        self.fill(count)?;
        let out = self.buf[self.start..self.start + count].to_vec();
        self.start += count;
        self.position += count;
        Ok(out)
    }

    fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.fill(count)?;
        self.start += count;
        self.position += count;
        Ok(())
    }

    /// Читает ключ до NUL-терминатора (сам терминатор потребляется).
    fn read_cstring(&mut self) -> Result<String, DecodeError> {
        loop {
            if let Some(nul) = memchr(0, &self.buf[self.start..]) {
                let raw = self.buf[self.start..self.start + nul].to_vec();
                self.start += nul + 1;
                self.position += nul + 1;
                return String::from_utf8(raw)
                    .map_err(|_| DecodeError::InvalidUtf8 { what: "element key" });
            }
            let have = self.buffered();
            self.fill(have + 1)?;
        }
    }
}

/// Потоковый читатель документа.
///
/// Создаётся либо на целом документе (`new`/`from_slice`), либо на байтах
/// одиночного значения известного типа (`for_value`) — последнее нужно
/// ленивым значениям, разбираемым по требованию.
pub struct Reader<'a> {
    src: TrackingSource<'a>,
    doc_starts: Vec<usize>,
    doc_sizes: Vec<usize>,
    on_element: bool,
    value_type: Tag,
    value_size: usize,
}

impl<'a> Reader<'a> {
    pub fn new(source: impl Read + 'a) -> Result<Self, DecodeError> {
        Self::for_source(TrackingSource::new(source), Tag::Document)
    }

    pub fn from_slice(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        Self::new(bytes)
    }

    /// Читатель, позиционированный на значении типа `tag`, чьи байты
    /// полезной нагрузки и есть `bytes` целиком.
    pub fn for_value(bytes: &'a [u8], tag: Tag) -> Result<Self, DecodeError> {
        Self::for_source(TrackingSource::new(bytes), tag)
    }

    fn for_source(src: TrackingSource<'a>, tag: Tag) -> Result<Self, DecodeError> {
        let mut reader = Reader {
            src,
            doc_starts: Vec::new(),
            doc_sizes: Vec::new(),
            on_element: false,
            value_type: tag,
            value_size: 0,
        };
        reader.measure_value()?;
        Ok(reader)
    }

    /// Абсолютное смещение потреблённых байтов.
    pub fn position(&self) -> usize {
        self.src.position
    }

    /// Метка значения, на котором стоит курсор.
    pub fn value_type(&self) -> Tag {
        self.value_type
    }

    /// Полный размер текущего значения в байтах (включая префиксы длины).
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Текущая глубина вложенности открытых документов.
    pub fn depth(&self) -> usize {
        self.doc_starts.len()
    }

    /// Предвычисляет размер текущего значения: константа для типов
    /// фиксированного размера, упреждающее чтение префикса для остальных.
    fn measure_value(&mut self) -> Result<(), DecodeError> {
        self.value_size = match self.value_type {
            Tag::Boolean => 1,
            Tag::Int32 => 4,
            Tag::Int64 => 8,
            Tag::Document | Tag::Array => {
                let prefix = self.src.peek(4)?;
                u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize
            }
            Tag::String => {
                // префикс строки не учитывает сам себя
                let prefix = self.src.peek(4)?;
                u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize + 4
            }
        };
        Ok(())
    }

    fn ensure_value(&self, requested: Tag) -> Result<(), DecodeError> {
        if self.value_type != requested {
            return Err(DecodeError::ValueType {
                actual: self.value_type,
                requested,
            }
            .at(self.position()));
        }
        if self.on_element {
            return Err(DecodeError::NotValue.at(self.position()));
        }
        Ok(())
    }

    /// Открывает вложенный (или верхнеуровневый) документ: заводит кадр и
    /// переводит курсор на первый элемент нового документа.
    pub fn read_document(&mut self) -> Result<(), DecodeError> {
        self.ensure_value(Tag::Document)?;
        if self.depth() >= MAX_DOCUMENT_DEPTH {
            return Err(DecodeError::DepthLimit {
                current: self.depth() + 1,
                max: MAX_DOCUMENT_DEPTH,
            });
        }
        self.doc_starts.push(self.position());
        let prefix = self.src.read_exact(4)?;
        self.doc_sizes
            .push(u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize);
        self.on_element = true;
        Ok(())
    }

    /// Читает метку и ключ очередного элемента.
    ///
    /// `Ok(None)` — терминатор документа: кадр снимается, заявленная длина
    /// сверяется с потреблёнными байтами, курсор остаётся на элементе
    /// внешнего документа.
    pub fn read_element(&mut self) -> Result<Option<String>, DecodeError> {
        if !self.on_element {
            return Err(DecodeError::NotElement.at(self.position()));
        }
        let tag_byte = self.src.read_byte()?;
        if tag_byte == 0 {
            let (start, declared) = match (self.doc_starts.pop(), self.doc_sizes.pop()) {
                (Some(start), Some(declared)) => (start, declared),
                _ => return Err(DecodeError::NotElement.at(self.position())),
            };
            let consumed = self.position() - start;
            if consumed != declared {
                error!(
                    position = self.position(),
                    declared, consumed, "document length mismatch"
                );
                return Err(DecodeError::InvalidDocumentLength {
                    position: self.position(),
                    declared,
                    consumed,
                });
            }
            return Ok(None);
        }
        let tag = Tag::from_byte(tag_byte)
            .ok_or_else(|| DecodeError::InvalidTypeTag { byte: tag_byte }.at(self.position()))?;
        let key = self.src.read_cstring()?;
        self.value_type = tag;
        self.on_element = false;
        self.measure_value()?;
        trace!(key = %key, tag = %tag, size = self.value_size, "element");
        Ok(Some(key))
    }

    pub fn read_boolean(&mut self) -> Result<bool, DecodeError> {
        self.ensure_value(Tag::Boolean)?;
        let byte = self.src.read_byte()?;
        self.on_element = true;
        match byte {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(DecodeError::InvalidBoolean { byte }.at(self.position())),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure_value(Tag::Int32)?;
        let raw = self.src.read_exact(4)?;
        self.on_element = true;
        Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        self.ensure_value(Tag::Int64)?;
        let raw = self.src.read_exact(8)?;
        self.on_element = true;
        Ok(i64::from_le_bytes([
            raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
        ]))
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        self.ensure_value(Tag::String)?;
        if self.value_size < 5 {
            return Err(DecodeError::MalformedValue {
                tag: Tag::String,
                reason: "declared length too small",
            }
            .at(self.position()));
        }
        let raw = self.src.read_exact(self.value_size)?;
        self.on_element = true;
        if raw[raw.len() - 1] != 0 {
            return Err(DecodeError::UnterminatedString.at(self.position()));
        }
        String::from_utf8(raw[4..raw.len() - 1].to_vec())
            .map_err(|_| DecodeError::InvalidUtf8 { what: "string value" }.at(self.position()))
    }

    /// Отдаёт точные байты текущего значения без интерпретации, позволяя
    /// отложить разбор. Подходит для любой метки.
    pub fn read_bytes(&mut self) -> Result<Bytes, DecodeError> {
        if self.on_element {
            return Err(DecodeError::NotValue.at(self.position()));
        }
        let raw = self.src.read_exact(self.value_size)?;
        self.on_element = true;
        Ok(Bytes::from(raw))
    }

    /// Потребляет байты текущего значения, ничего не возвращая.
    pub fn skip(&mut self) -> Result<(), DecodeError> {
        if self.on_element {
            return Err(DecodeError::NotValue.at(self.position()));
        }
        self.src.skip(self.value_size)?;
        self.on_element = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    /// Каноничный вектор `{x: {a: "b"}}`.
    const NESTED: &[u8] = &[
        0x16, 0x00, 0x00, 0x00, 0x03, b'x', 0x00, 0x0e, 0x00, 0x00, 0x00, 0x02, b'a', 0x00, 0x02,
        0x00, 0x00, 0x00, b'b', 0x00, 0x00, 0x00,
    ];

    fn inner(err: DecodeError) -> DecodeError {
        err.into_inner()
    }

    /// Минимальный документ `0500000000` пуст.
    #[test]
    fn test_empty_document() {
        let mut reader = Reader::from_slice(&[0x05, 0x00, 0x00, 0x00, 0x00]).unwrap();
        reader.read_document().unwrap();
        assert_eq!(reader.read_element().unwrap(), None);
        assert_eq!(reader.position(), 5);
    }

    /// Полный обход вложенного документа.
    #[test]
    fn test_nested_document_walk() {
        let mut reader = Reader::from_slice(NESTED).unwrap();
        reader.read_document().unwrap();

        assert_eq!(reader.read_element().unwrap(), Some("x".to_string()));
        assert_eq!(reader.value_type(), Tag::Document);
        reader.read_document().unwrap();

        assert_eq!(reader.read_element().unwrap(), Some("a".to_string()));
        assert_eq!(reader.value_type(), Tag::String);
        assert_eq!(reader.read_string().unwrap(), "b");

        assert_eq!(reader.read_element().unwrap(), None); // конец внутреннего
        assert_eq!(reader.read_element().unwrap(), None); // конец внешнего
        assert_eq!(reader.position(), NESTED.len());
    }

    /// Искажённый префикс длины обнаруживается на терминаторе.
    #[rstest]
    #[case(&[0x06, 0x00, 0x00, 0x00, 0x00], 6)] // заявлено больше
    #[case(&[0x04, 0x00, 0x00, 0x00, 0x00], 4)] // заявлено меньше
    fn test_invalid_document_length(#[case] bytes: &[u8], #[case] expected_declared: usize) {
        let mut reader = Reader::from_slice(bytes).unwrap();
        reader.read_document().unwrap();
        let err = reader.read_element().unwrap_err();
        match err {
            DecodeError::InvalidDocumentLength {
                position,
                declared,
                consumed,
            } => {
                assert_eq!(position, 5);
                assert_eq!(declared, expected_declared);
                assert_eq!(consumed, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Доступ к значению с чужой меткой — ошибка типа, не мусор.
    #[test]
    fn test_value_type_mismatch() {
        let mut reader = Reader::from_slice(NESTED).unwrap();
        reader.read_document().unwrap();
        reader.read_element().unwrap();
        // курсор на значении типа document
        let err = inner(reader.read_i32().unwrap_err());
        assert!(matches!(
            err,
            DecodeError::ValueType {
                actual: Tag::Document,
                requested: Tag::Int32,
            }
        ));
    }

    /// Чтение значения, когда курсор стоит на элементе.
    #[test]
    fn test_not_value_misuse() {
        let mut reader = Reader::from_slice(NESTED).unwrap();
        let err = inner(reader.read_element().unwrap_err());
        assert!(matches!(err, DecodeError::NotElement));

        reader.read_document().unwrap();
        let err = inner(reader.read_document().unwrap_err());
        assert!(matches!(err, DecodeError::NotValue));
    }

    /// Булево значение допускает только байты 0 и 1.
    #[test]
    fn test_malformed_boolean() {
        // {b: true}, но байт значения равен 2
        let bytes = &[
            0x09, 0x00, 0x00, 0x00, 0x08, b'b', 0x00, 0x02, 0x00,
        ];
        let mut reader = Reader::from_slice(bytes).unwrap();
        reader.read_document().unwrap();
        reader.read_element().unwrap();
        let err = inner(reader.read_boolean().unwrap_err());
        assert!(matches!(err, DecodeError::InvalidBoolean { byte: 2 }));
    }

    /// Строка без NUL на заявленной позиции — фатальная ошибка.
    #[test]
    fn test_unterminated_string() {
        let bytes = &[
            0x0e, 0x00, 0x00, 0x00, 0x02, b'a', 0x00, 0x02, 0x00, 0x00, 0x00, b'b', b'X', 0x00,
        ];
        let mut reader = Reader::from_slice(bytes).unwrap();
        reader.read_document().unwrap();
        reader.read_element().unwrap();
        let err = inner(reader.read_string().unwrap_err());
        assert!(matches!(err, DecodeError::UnterminatedString));
    }

    /// `skip` потребляет значение целиком и возвращает курсор на элемент.
    #[test]
    fn test_skip_value() {
        let mut reader = Reader::from_slice(NESTED).unwrap();
        reader.read_document().unwrap();
        reader.read_element().unwrap();
        reader.skip().unwrap(); // пропускаем вложенный документ
        assert_eq!(reader.read_element().unwrap(), None);
    }

    /// `read_bytes` отдаёт точные байты значения, включая префиксы.
    #[test]
    fn test_read_bytes_exact() {
        let mut reader = Reader::from_slice(NESTED).unwrap();
        reader.read_document().unwrap();
        reader.read_element().unwrap();
        let raw = reader.read_bytes().unwrap();
        assert_eq!(raw.as_ref(), &NESTED[7..21]);
    }

    /// Неизвестный байт метки отвергается с указанием смещения.
    #[test]
    fn test_unknown_tag_byte() {
        let bytes = &[0x08, 0x00, 0x00, 0x00, 0x7f, b'k', 0x00, 0x00];
        let mut reader = Reader::from_slice(bytes).unwrap();
        reader.read_document().unwrap();
        let err = inner(reader.read_element().unwrap_err());
        assert!(matches!(err, DecodeError::InvalidTypeTag { byte: 0x7f }));
    }

    fn deeply_nested(levels: usize) -> Vec<u8> {
        // самый внутренний — пустой документ
        let mut doc = vec![0x05, 0x00, 0x00, 0x00, 0x00];
        for _ in 1..levels {
            let mut outer = Vec::with_capacity(doc.len() + 8);
            let total = (4 + 3 + doc.len() + 1) as u32;
            outer.extend_from_slice(&total.to_le_bytes());
            outer.push(Tag::Document.as_byte());
            outer.extend_from_slice(b"a\x00");
            outer.extend_from_slice(&doc);
            outer.push(0x00);
            doc = outer;
        }
        doc
    }

    /// Вложенность глубже лимита отвергается без переполнения стека.
    #[test]
    fn test_depth_limit() {
        let bytes = deeply_nested(MAX_DOCUMENT_DEPTH + 1);
        let mut reader = Reader::from_slice(&bytes).unwrap();
        let mut result = Ok(());
        for _ in 0..=MAX_DOCUMENT_DEPTH {
            result = reader.read_document();
            if result.is_err() {
                break;
            }
            match reader.read_element() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("ran out of nesting before the limit"),
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        assert!(matches!(
            result.unwrap_err(),
            DecodeError::DepthLimit { max: MAX_DOCUMENT_DEPTH, .. }
        ));
    }

    /// Вложенность на самом лимите читается успешно.
    #[test]
    fn test_depth_at_limit() {
        let bytes = deeply_nested(MAX_DOCUMENT_DEPTH);
        let mut reader = Reader::from_slice(&bytes).unwrap();
        let mut open = 0usize;
        reader.read_document().unwrap();
        open += 1;
        while open > 0 {
            match reader.read_element().unwrap() {
                Some(_) => {
                    reader.read_document().unwrap();
                    open += 1;
                }
                None => open -= 1,
            }
        }
        assert_eq!(reader.position(), bytes.len());
    }
}
