use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Mapping from classifier output index to emotion label, converted from the
/// flat string-keyed JSON artifact once at load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassMetadata {
    labels: BTreeMap<usize, String>,
}

impl ClassMetadata {
    pub fn new(labels: BTreeMap<usize, String>) -> Self {
        Self { labels }
    }

    /// Parse the sibling metadata artifact, e.g. `{"0": "neutral", "1": "calm"}`.
    /// Anything other than a flat string-to-string map is rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DomainError> {
        let raw: BTreeMap<String, String> = serde_json::from_reader(reader)
            .map_err(|err| DomainError::invalid_metadata(err.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|err| DomainError::invalid_metadata(err.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, String>) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::invalid_metadata("no class entries"));
        }
        let mut labels = BTreeMap::new();
        for (key, label) in raw {
            let index: usize = key.parse().map_err(|_| {
                DomainError::invalid_metadata(format!("class index {key:?} is not an integer"))
            })?;
            labels.insert(index, label);
        }
        Ok(Self { labels })
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.labels.iter().map(|(index, label)| (*index, label.as_str()))
    }
}
