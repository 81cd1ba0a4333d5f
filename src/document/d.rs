//! `D` — упорядоченное представление документа.
//!
//! Список пар в порядке провода. Дубликаты ключей сохраняются как
//! есть; поиск возвращает первое вхождение. Подходит, когда порядок
//! элементов значим или документ нужно воспроизвести байт в байт.

use crate::codec::container::{AnyValue, Container};

/// Элемент упорядоченного документа.
#[derive(Debug, Clone, PartialEq)]
pub struct DocElem {
    pub key: String,
    pub value: AnyValue<D>,
}

/// Упорядоченный документ.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct D(pub Vec<DocElem>);

impl D {
    pub fn new() -> Self {
        D(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Добавляет пару в конец, не глядя на дубликаты.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<AnyValue<D>>) {
        self.0.push(DocElem {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Первое вхождение ключа в порядке документа.
    pub fn get(&self, key: &str) -> Option<&AnyValue<D>> {
        self.0
            .iter()
            .find(|elem| elem.key == key)
            .map(|elem| &elem.value)
    }
}

impl Container for D {
    fn empty() -> Self {
        D::new()
    }

    fn insert(&mut self, key: String, value: AnyValue<Self>) {
        self.0.push(DocElem { key, value });
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a str, &'a AnyValue<Self>)> + 'a> {
        Box::new(self.0.iter().map(|elem| (elem.key.as_str(), &elem.value)))
    }
}

impl From<D> for AnyValue<D> {
    fn from(value: D) -> Self {
        AnyValue::Container(value)
    }
}

impl<K: Into<String>, V: Into<AnyValue<D>>> FromIterator<(K, V)> for D {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = D::new();
        for (key, value) in iter {
            doc.push(key, value);
        }
        doc
    }
}
