use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Semantic relationship between a source and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionType {
    Bookmark,
    Reply,
    Like,
    Mention,
    Repost,
    Generic,
}

impl std::fmt::Display for MentionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MentionType::Bookmark => write!(f, "bookmark"),
            MentionType::Reply => write!(f, "reply"),
            MentionType::Like => write!(f, "like"),
            MentionType::Mention => write!(f, "mention"),
            MentionType::Repost => write!(f, "repost"),
            MentionType::Generic => write!(f, "generic"),
        }
    }
}

impl MentionType {
    /// Map a microformats property tag (`in-reply-to`, `like-of`, ...) to a type.
    /// Unknown tags map to `Generic`.
    pub fn from_property(property: &str) -> Self {
        match property {
            "bookmark-of" => Self::Bookmark,
            "in-reply-to" => Self::Reply,
            "like-of" => Self::Like,
            "mention-of" => Self::Mention,
            "repost-of" => Self::Repost,
            _ => Self::Generic,
        }
    }

    /// Inverse of `from_property`. `Generic` has no tag of its own.
    pub fn property_tag(&self) -> Option<&'static str> {
        match self {
            Self::Bookmark => Some("bookmark-of"),
            Self::Reply => Some("in-reply-to"),
            Self::Like => Some("like-of"),
            Self::Mention => Some("mention-of"),
            Self::Repost => Some("repost-of"),
            Self::Generic => None,
        }
    }

    /// Parse the serialized name back into a type. Used for the `type` query filter.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bookmark" => Some(Self::Bookmark),
            "reply" => Some(Self::Reply),
            "like" => Some(Self::Like),
            "mention" => Some(Self::Mention),
            "repost" => Some(Self::Repost),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionStatus {
    Pending,
}

// --- Enrichment ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Author {
    /// Drop empty strings; returns `None` when nothing is left.
    pub fn normalized(self) -> Option<Self> {
        let author = Self {
            name: non_empty(self.name),
            photo: non_empty(self.photo),
            url: non_empty(self.url),
        };
        if author == Self::default() {
            None
        } else {
            Some(author)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MentionContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl MentionContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            html: None,
        }
    }

    pub fn normalized(self) -> Option<Self> {
        let content = Self {
            text: non_empty(self.text),
            html: non_empty(self.html),
        };
        if content == Self::default() {
            None
        } else {
            Some(content)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// --- Records ---

/// Canonical mention record, as stored under its target and returned by queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub mention_type: MentionType,
    pub received_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_at: Option<DateTime<Utc>>,
    /// Canonical URL of the source entry, when it differs from `source`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MentionContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    /// Upstream identifier when imported from an aggregator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Extra keyed fields, e.g. the original property tag mapped to the target.
    #[serde(flatten)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Mention {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        mention_type: MentionType,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mention_type,
            received_at,
            parsed_at: None,
            url: None,
            content: None,
            author: None,
            id: None,
            properties: BTreeMap::new(),
        }
    }

    /// Move the mention to `target`, carrying along any property tag that
    /// pointed at the old target.
    pub fn retarget(&mut self, target: String) {
        if self.target == target {
            return;
        }
        let previous = serde_json::Value::String(std::mem::replace(&mut self.target, target));
        for value in self.properties.values_mut() {
            if *value == previous {
                *value = serde_json::Value::String(self.target.clone());
            }
        }
    }

    /// True when both records occupy the same storage slot. Stores keep
    /// `target` in its `page_key` form, so a plain comparison is enough.
    pub fn same_slot(&self, other: &Mention) -> bool {
        self.target == other.target
            && self.source == other.source
            && self.mention_type == other.mention_type
    }
}

/// A submission accepted but not yet verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMention {
    pub id: Uuid,
    pub source: String,
    pub target: String,
    pub received_at: DateTime<Utc>,
    pub status: MentionStatus,
}

impl PendingMention {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            target: target.into(),
            received_at: Utc::now(),
            status: MentionStatus::Pending,
        }
    }
}
