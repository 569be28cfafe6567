use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::language::Language;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Bank {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Comparison attributes vary per bank, so they are kept as raw JSON.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Article {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub title_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_importance")]
    pub importance: Option<u8>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Stored scores are either numbers or numeric strings. Anything else reads
/// as unscored rather than failing the whole list.
fn lenient_importance<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let importance = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(importance)
}

impl Article {
    pub fn title_in(&self, language: Language) -> &str {
        match (language, &self.title_id) {
            (Language::Id, Some(title)) if !title.is_empty() => title,
            _ => &self.title,
        }
    }

    pub fn content_in(&self, language: Language) -> Option<&str> {
        match language {
            Language::Id => self.content_id.as_deref().or(self.content.as_deref()),
            Language::En => self.content.as_deref(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DailySummary {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub summary_en: String,
    #[serde(default)]
    pub summary_id: String,
    #[serde(default)]
    pub advice_en: String,
    #[serde(default)]
    pub advice_id: String,
    #[serde(default)]
    pub search_results: Vec<Value>,
}

impl DailySummary {
    pub fn summary(&self, language: Language) -> &str {
        match language {
            Language::En => &self.summary_en,
            Language::Id => &self.summary_id,
        }
    }

    pub fn advice(&self, language: Language) -> &str {
        match language {
            Language::En => &self.advice_en,
            Language::Id => &self.advice_id,
        }
    }

    /// Day the summary was generated, if `last_updated` is an ISO timestamp.
    pub fn updated_on(&self) -> Option<NaiveDate> {
        self.last_updated
            .parse::<NaiveDateTime>()
            .ok()
            .map(|dt| dt.date())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DailySummaryPayload {
    #[serde(default)]
    pub daily_summary: DailySummary,
    #[serde(default)]
    pub user_desc: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PreferenceTags {
    #[serde(default)]
    pub banks: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DescriptionUpdate {
    pub new_desc: String,
    pub desc_updated: bool,
    pub reply: Option<String>,
}
