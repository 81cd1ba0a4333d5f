//! Потоковое построение бинарных документов.
//!
//! Длина документа известна только после записи всех его элементов,
//! поэтому `Writer` держит стек незавершённых буферов — по одному на
//! открытый документ. `write_end_document` дописывает терминатор,
//! измеряет дочерний буфер и вклеивает `длина ‖ тело` в родительский.
//! Резервировать место заранее нельзя: это либо тратило бы память, либо
//! требовало бы второго прохода по произвольно вложенным данным.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::trace;

use crate::{
    codec::{reader::MAX_DOCUMENT_DEPTH, types::Tag},
    error::EncodeError,
};

struct WriterFrame {
    buf: Vec<u8>,
    pending_key: Option<String>,
    on_element: bool,
}

impl WriterFrame {
    fn new(on_element: bool) -> Self {
        WriterFrame {
            buf: Vec::new(),
            pending_key: None,
            on_element,
        }
    }
}

/// Построитель документа со стеком отложенных буферов.
///
/// Протокол вызовов зеркален читателю: `write_document`, затем пары
/// `write_element` + запись значения, затем `write_end_document`.
/// Вызов вне ожидаемого состояния — структурная ошибка.
pub struct Writer {
    position: usize,
    frames: Vec<WriterFrame>,
}

impl Writer {
    pub fn new() -> Self {
        Writer {
            position: 0,
            // нулевой кадр — итоговый верхнеуровневый буфер
            frames: vec![WriterFrame::new(false)],
        }
    }

    /// Байты, записанные с учётом зарезервированных префиксов длины.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Глубина открытых документов.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn top(&mut self) -> Result<&mut WriterFrame, EncodeError> {
        self.frames.last_mut().ok_or(EncodeError::NoOpenDocument)
    }

    /// Сбрасывает метку и отложенный ключ в текущий буфер перед записью
    /// значения.
    fn flush_element_header(&mut self, tag: Tag) -> Result<(), EncodeError> {
        let frame = self.top()?;
        if frame.on_element {
            return Err(EncodeError::NotValue);
        }
        let key = frame.pending_key.take().ok_or(EncodeError::NoPendingKey)?;
        frame.buf.push(tag.as_byte());
        frame.buf.extend_from_slice(key.as_bytes());
        frame.buf.push(0);
        self.position += 1 + key.len() + 1;
        Ok(())
    }

    fn begin_scalar(&mut self, tag: Tag) -> Result<(), EncodeError> {
        if self.depth() == 0 {
            return Err(EncodeError::NoOpenDocument);
        }
        self.flush_element_header(tag)
    }

    fn finish_value(&mut self) -> Result<(), EncodeError> {
        self.top()?.on_element = true;
        Ok(())
    }

    /// Открывает документ: на верхнем уровне — без метки и ключа, во
    /// вложенной позиции сначала сбрасывает отложенный ключ в родителя.
    pub fn write_document(&mut self) -> Result<(), EncodeError> {
        if self.depth() >= MAX_DOCUMENT_DEPTH {
            return Err(EncodeError::DepthLimit {
                current: self.depth() + 1,
                max: MAX_DOCUMENT_DEPTH,
            });
        }
        if self.depth() > 0 {
            self.flush_element_header(Tag::Document)?;
        }
        self.frames.push(WriterFrame::new(true));
        self.position += 4; // место под будущий префикс длины
        trace!(depth = self.depth(), "begin document");
        Ok(())
    }

    /// Запоминает ключ элемента; ровно одна запись значения должна
    /// последовать до следующего `write_element` или `write_end_document`.
    pub fn write_element(&mut self, name: &str) -> Result<(), EncodeError> {
        if self.depth() == 0 {
            return Err(EncodeError::NoOpenDocument);
        }
        if name.as_bytes().contains(&0) {
            return Err(EncodeError::InvalidKey {
                key: name.to_string(),
            });
        }
        let frame = self.top()?;
        if !frame.on_element {
            return Err(EncodeError::NotElement);
        }
        frame.pending_key = Some(name.to_string());
        frame.on_element = false;
        Ok(())
    }

    pub fn write_boolean(&mut self, value: bool) -> Result<(), EncodeError> {
        self.begin_scalar(Tag::Boolean)?;
        self.top()?.buf.push(value as u8);
        self.position += 1;
        self.finish_value()
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), EncodeError> {
        self.begin_scalar(Tag::Int32)?;
        self.top()?.buf.write_i32::<LittleEndian>(value)?;
        self.position += 4;
        self.finish_value()
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), EncodeError> {
        self.begin_scalar(Tag::Int64)?;
        self.top()?.buf.write_i64::<LittleEndian>(value)?;
        self.position += 8;
        self.finish_value()
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), EncodeError> {
        self.begin_scalar(Tag::String)?;
        let frame = self.top()?;
        frame.buf.write_i32::<LittleEndian>(value.len() as i32 + 1)?;
        frame.buf.extend_from_slice(value.as_bytes());
        frame.buf.push(0);
        self.position += 4 + value.len() + 1;
        self.finish_value()
    }

    /// Записывает значение его точными байтами провода. Нужен
    /// представлениям, которые хранят неразобранную нагрузку и обязаны
    /// воспроизводить байты один в один.
    pub fn write_raw(&mut self, tag: Tag, payload: &[u8]) -> Result<(), EncodeError> {
        self.begin_scalar(tag)?;
        self.top()?.buf.extend_from_slice(payload);
        self.position += payload.len();
        self.finish_value()
    }

    /// Закрывает текущий документ и вклеивает `длина ‖ тело` в родителя.
    /// Родитель после этого готов к следующему элементу.
    pub fn write_end_document(&mut self) -> Result<(), EncodeError> {
        if self.depth() == 0 {
            return Err(EncodeError::NoOpenDocument);
        }
        if let Some(key) = &self.top()?.pending_key {
            return Err(EncodeError::KeyPending { key: key.clone() });
        }
        let mut child = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(EncodeError::NoOpenDocument),
        };
        child.buf.push(0);
        self.position += 1;
        let total = child.buf.len() + 4;
        let parent = self.top()?;
        parent.buf.write_i32::<LittleEndian>(total as i32)?;
        parent.buf.extend_from_slice(&child.buf);
        parent.on_element = true;
        trace!(size = total, depth = self.depth(), "end document");
        Ok(())
    }

    /// Сбрасывает завершённый верхнеуровневый буфер в приёмник.
    pub fn write_to(&self, sink: &mut impl Write) -> Result<usize, EncodeError> {
        if self.depth() != 0 {
            return Err(EncodeError::UnfinishedDocument { open: self.depth() });
        }
        let root = &self.frames[0].buf;
        sink.write_all(root)?;
        Ok(root.len())
    }

    /// Забирает завершённый верхнеуровневый буфер.
    pub fn into_vec(mut self) -> Result<Vec<u8>, EncodeError> {
        if self.depth() != 0 {
            return Err(EncodeError::UnfinishedDocument { open: self.depth() });
        }
        Ok(self.frames.swap_remove(0).buf)
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}
