//! Name-indexed tables preserving declaration order

use std::collections::HashMap;

use crate::errors::{ConfigError, ConfigResult};

/// Components of one kind, looked up by name, iterated in declaration order
#[derive(Clone)]
pub struct NamedTable<T> {
    kind: &'static str,
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> NamedTable<T> {
    /// Empty table; `kind` names the namespace in duplicate errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add an entry; a name may only be declared once
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> ConfigResult<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(ConfigError::Duplicate {
                line: 0,
                kind: self.kind,
                name,
            });
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Namespace label
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declaration_order() {
        let mut table = NamedTable::new("monitor");
        table.insert("zeta", 1).unwrap();
        table.insert("alpha", 2).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(table.get("alpha"), Some(&2));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut table = NamedTable::new("filter");
        table.insert("wind", ()).unwrap();
        let err = table.insert("wind", ()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Duplicate {
                line: 0,
                kind: "filter",
                name: "wind".into()
            }
        );
    }
}
