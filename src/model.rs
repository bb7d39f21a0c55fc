use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerbCategory {
    #[default]
    #[serde(rename = "regular")]
    Regular,
    #[serde(rename = "irregular")]
    Irregular,
    #[serde(rename = "phrasal")]
    Phrasal,
}

impl VerbCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerbCategory::Regular => "regular",
            VerbCategory::Irregular => "irregular",
            VerbCategory::Phrasal => "phrasal",
        }
    }

    /// Phrasal verbs have no simple-past or participle forms of their own.
    pub fn requires_past_forms(&self) -> bool {
        !matches!(self, VerbCategory::Phrasal)
    }
}

/// Wire form of one verb entry, exactly as stored in the remote document.
/// Field names match the documents already in production, so lists created
/// by older clients keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbRecord {
    #[serde(rename = "verbo")]
    pub base_form: String,
    #[serde(rename = "traduccion")]
    pub translation: String,
    #[serde(rename = "pasado", default)]
    pub past_simple: String,
    #[serde(rename = "participio", default)]
    pub past_participle: String,
    #[serde(rename = "tipo", default)]
    pub category: VerbCategory,
}

/// One entry of a user's verb list. The `id` exists only in this process:
/// it is assigned on receipt and stripped before anything is written back,
/// which is why `VerbEntry` itself is never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbEntry {
    pub id: String,
    pub base_form: String,
    pub translation: String,
    pub past_simple: String,
    pub past_participle: String,
    pub category: VerbCategory,
}

impl VerbEntry {
    pub fn new(record: VerbRecord) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), record)
    }

    pub fn with_id(id: String, record: VerbRecord) -> Self {
        Self {
            id,
            base_form: record.base_form,
            translation: record.translation,
            past_simple: record.past_simple,
            past_participle: record.past_participle,
            category: record.category,
        }
    }

    pub fn record(&self) -> VerbRecord {
        VerbRecord {
            base_form: self.base_form.clone(),
            translation: self.translation.clone(),
            past_simple: self.past_simple.clone(),
            past_participle: self.past_participle.clone(),
            category: self.category,
        }
    }
}

/// Ascending by translation, case-insensitively, with the raw string as a
/// tie-breaker so equal-folded translations still order deterministically.
pub fn compare_translations(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn sort_by_translation(entries: &mut [VerbEntry]) {
    entries.sort_by(|a, b| compare_translations(&a.translation, &b.translation));
}
