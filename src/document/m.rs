//! `M` — неупорядоченное представление документа.
//!
//! Обёртка над `HashMap`: порядок элементов не сохраняется, дубликат
//! ключа на проводе затирает предыдущее значение. Подходит для
//! доступа по ключу, когда порядок провода не важен.

use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
};

use crate::codec::container::{AnyValue, Container};

/// Неупорядоченный документ.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct M(pub HashMap<String, AnyValue<M>>);

impl M {
    pub fn new() -> Self {
        M(HashMap::new())
    }
}

impl Deref for M {
    type Target = HashMap<String, AnyValue<M>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for M {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Container for M {
    fn empty() -> Self {
        M::new()
    }

    fn insert(&mut self, key: String, value: AnyValue<Self>) {
        self.0.insert(key, value);
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a str, &'a AnyValue<Self>)> + 'a> {
        Box::new(self.0.iter().map(|(key, value)| (key.as_str(), value)))
    }
}

impl From<M> for AnyValue<M> {
    fn from(value: M) -> Self {
        AnyValue::Container(value)
    }
}

impl<K: Into<String>, V: Into<AnyValue<M>>> FromIterator<(K, V)> for M {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        M(iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect())
    }
}
