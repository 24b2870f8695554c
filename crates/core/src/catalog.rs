//! Chapter order registry.
//!
//! A `Catalog` lists the supported topics in their fixed display order, each
//! with a weight and an ordered chapter list. It is handed to the calculator
//! and the progress service at construction time, so deployments (and tests)
//! can ship their own ordering instead of the builtin one.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weight used for topics that are unknown or configured with weight 0.
pub const DEFAULT_TOPIC_WEIGHT: u32 = 25;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog must contain at least one topic")]
    Empty,

    #[error("topic id cannot be empty")]
    EmptyTopicId,

    #[error("duplicate topic: {0}")]
    DuplicateTopic(String),

    #[error("topic {topic} lists chapter {chapter} more than once")]
    DuplicateChapter { topic: String, chapter: String },

    #[error("topic {topic} has an empty chapter id")]
    EmptyChapter { topic: String },

    #[error("estimated duration for {topic}/{chapter} must be > 0")]
    InvalidEstimate { topic: String, chapter: String },

    #[error("estimated duration given for unknown chapter {topic}/{chapter}")]
    UnknownEstimateChapter { topic: String, chapter: String },
}

//
// ─── TOPICS ────────────────────────────────────────────────────────────────────
//

/// One topic entry: identity, display name, weight and chapter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub chapters: Vec<String>,
    /// Expected reading time per chapter, in seconds.
    #[serde(default)]
    pub estimated_seconds: HashMap<String, u64>,
}

impl TopicSpec {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            chapters: Vec::new(),
            estimated_seconds: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_chapters<I, S>(mut self, chapters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chapters = chapters.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_estimate(mut self, chapter: impl Into<String>, seconds: u64) -> Self {
        self.estimated_seconds.insert(chapter.into(), seconds);
        self
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    topics: Vec<TopicSpec>,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Validated, ordered set of supported topics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct Catalog {
    topics: Vec<TopicSpec>,
    index: HashMap<String, usize>,
}

impl TryFrom<CatalogFile> for Catalog {
    type Error = CatalogError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        Catalog::new(file.topics)
    }
}

impl Catalog {
    /// Build a catalog; topic order in `topics` becomes the display order.
    ///
    /// Blank display names fall back to the topic id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for empty or duplicate ids and for estimates
    /// that are zero or point at chapters the topic does not list.
    pub fn new(topics: Vec<TopicSpec>) -> Result<Self, CatalogError> {
        if topics.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(topics.len());
        let mut normalized = Vec::with_capacity(topics.len());
        for (pos, mut topic) in topics.into_iter().enumerate() {
            topic.id = topic.id.trim().to_string();
            if topic.id.is_empty() {
                return Err(CatalogError::EmptyTopicId);
            }
            if index.insert(topic.id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateTopic(topic.id));
            }
            if topic.name.trim().is_empty() {
                topic.name = topic.id.clone();
            }

            let mut seen = HashSet::new();
            for chapter in &topic.chapters {
                if chapter.trim().is_empty() {
                    return Err(CatalogError::EmptyChapter {
                        topic: topic.id.clone(),
                    });
                }
                if !seen.insert(chapter.as_str()) {
                    return Err(CatalogError::DuplicateChapter {
                        topic: topic.id.clone(),
                        chapter: chapter.clone(),
                    });
                }
            }
            for (chapter, secs) in &topic.estimated_seconds {
                if !seen.contains(chapter.as_str()) {
                    return Err(CatalogError::UnknownEstimateChapter {
                        topic: topic.id.clone(),
                        chapter: chapter.clone(),
                    });
                }
                if *secs == 0 {
                    return Err(CatalogError::InvalidEstimate {
                        topic: topic.id.clone(),
                        chapter: chapter.clone(),
                    });
                }
            }

            normalized.push(topic);
        }

        Ok(Self {
            topics: normalized,
            index,
        })
    }

    /// The four shipped topics with equal weight.
    ///
    /// # Panics
    ///
    /// Panics only if the builtin table itself is malformed.
    #[must_use]
    pub fn builtin() -> Self {
        let topics = vec![
            TopicSpec::new("lexical_elements", "Lexical Elements", DEFAULT_TOPIC_WEIGHT)
                .with_chapters([
                    "comments",
                    "tokens",
                    "semicolons",
                    "identifiers",
                    "keywords",
                    "operators",
                    "integers",
                    "floats",
                    "imaginary",
                    "runes",
                    "strings",
                ]),
            TopicSpec::new("constants", "Constants", DEFAULT_TOPIC_WEIGHT).with_chapters([
                "boolean",
                "rune",
                "integer",
                "floating_point",
                "complex",
                "string",
                "expressions",
                "typed_untyped",
                "conversions",
                "builtin_functions",
                "iota",
                "implementation_restrictions",
            ]),
            TopicSpec::new("variables", "Variables", DEFAULT_TOPIC_WEIGHT)
                .with_chapters(["storage", "static", "dynamic", "zero"]),
            TopicSpec::new("types", "Types", DEFAULT_TOPIC_WEIGHT).with_chapters([
                "boolean",
                "numeric",
                "string",
                "array",
                "slice",
                "struct",
                "pointer",
                "function",
                "interface_basic",
                "interface_embedded",
                "interface_general",
                "interface_impl",
                "map",
                "channel",
            ]),
        ];
        Self::new(topics).expect("builtin catalog is valid")
    }

    fn topic(&self, topic: &str) -> Option<&TopicSpec> {
        self.index.get(topic).map(|&i| &self.topics[i])
    }

    /// Topics in display order.
    pub fn topics(&self) -> impl Iterator<Item = &TopicSpec> {
        self.topics.iter()
    }

    #[must_use]
    pub fn is_supported(&self, topic: &str) -> bool {
        self.index.contains_key(topic)
    }

    /// Display name, or the id itself for unknown topics.
    #[must_use]
    pub fn topic_name<'a>(&'a self, topic: &'a str) -> &'a str {
        self.topic(topic).map_or(topic, |t| t.name.as_str())
    }

    #[must_use]
    pub fn topic_weight(&self, topic: &str) -> u32 {
        match self.topic(topic) {
            Some(t) if t.weight > 0 => t.weight,
            _ => DEFAULT_TOPIC_WEIGHT,
        }
    }

    /// Configured chapter count, 0 when the topic is unknown or lists none.
    #[must_use]
    pub fn chapter_total(&self, topic: &str) -> u32 {
        self.topic(topic)
            .map_or(0, |t| u32::try_from(t.chapters.len()).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn chapters(&self, topic: &str) -> &[String] {
        self.topic(topic)
            .map(|t| t.chapters.as_slice())
            .unwrap_or(&[])
    }

    /// Position in the display order; unknown topics sort after known ones.
    #[must_use]
    pub fn order_index(&self, topic: &str) -> usize {
        self.index.get(topic).copied().unwrap_or(self.topics.len())
    }

    /// Topic ids by weight (descending), ties broken by display order.
    #[must_use]
    pub fn topics_by_weight(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.topics.iter().map(|t| t.id.as_str()).collect();
        ids.sort_by(|a, b| {
            self.topic_weight(b)
                .cmp(&self.topic_weight(a))
                .then_with(|| self.order_index(a).cmp(&self.order_index(b)))
        });
        ids
    }

    #[must_use]
    pub fn estimated_seconds(&self, topic: &str, chapter: &str) -> Option<u64> {
        self.topic(topic)
            .and_then(|t| t.estimated_seconds.get(chapter))
            .copied()
            .filter(|secs| *secs > 0)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
