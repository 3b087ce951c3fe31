use itertools::Itertools;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{MalformedCatalogSnafu, Result};

pub type ItemId = u32;

/// A single vocabulary card. Never mutated by the scheduling engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: ItemId,
    /// Korean text shown on the front.
    pub source_text: String,
    pub romanization: String,
    /// English gloss shown on the back.
    pub target_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audio: Option<String>,
}

impl VocabularyItem {
    pub fn new(
        id: ItemId,
        source_text: impl Into<String>,
        romanization: impl Into<String>,
        target_text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_text: source_text.into(),
            romanization: romanization.into(),
            target_text: target_text.into(),
            source_audio: None,
            target_audio: None,
        }
    }

    pub fn with_audio(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_audio = Some(source.into());
        self.target_audio = Some(target.into());
        self
    }
}

/// Ordered, read-only vocabulary table. Ids are unique: when the input
/// repeats an id, the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<VocabularyItem>,
}

impl Catalog {
    pub fn from_items(items: impl IntoIterator<Item = VocabularyItem>) -> Self {
        Self {
            items: items.into_iter().unique_by(|item| item.id).collect(),
        }
    }

    /// Parses a JSON array of items.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let items: Vec<VocabularyItem> =
            serde_json::from_str(json).context(MalformedCatalogSnafu)?;
        Ok(Self::from_items(items))
    }

    pub fn items(&self) -> &[VocabularyItem] {
        &self.items
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|item| item.id)
    }

    pub fn get(&self, id: ItemId) -> Option<&VocabularyItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<VocabularyItem> for Catalog {
    fn from_iter<T: IntoIterator<Item = VocabularyItem>>(iter: T) -> Self {
        Self::from_items(iter)
    }
}
