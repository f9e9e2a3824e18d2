//! Screening data types and the content-addressed identity scheme

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Fingerprint of a logical screening.
///
/// Derived from title, start, cinema and language. Two records scraped from
/// different sources carry the same ID exactly when those four fields agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreeningId(String);

impl ScreeningId {
    /// Compute the fingerprint for the identifying fields of a screening.
    ///
    /// Every field is framed as `<len>:<bytes>;` before hashing, so
    /// ("A", "BC") and ("AB", "C") never produce the same digest. The start
    /// instant is normalized to UTC with whole-second precision.
    pub fn identify(
        title: &str,
        start: &DateTime<FixedOffset>,
        cinema: &str,
        language: &str,
    ) -> Self {
        let start = start
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut hasher = Sha256::new();
        for field in [title, start.as_str(), cinema, language] {
            hasher.update(field.len().to_string().as_bytes());
            hasher.update(b":");
            hasher.update(field.as_bytes());
            hasher.update(b";");
        }

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreeningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Detail page and thumbnail image of a screening
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningLinks {
    pub details: String,
    pub thumbnail: String,
}

/// One scheduled showing of a film at a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    id: ScreeningId,
    pub title: String,
    pub description: String,
    pub language: String,
    /// Start instant, kept in the offset the source reported it in
    pub start: DateTime<FixedOffset>,
    /// Zero when the source does not publish a runtime
    pub duration: Duration,
    pub cinema: String,
    pub links: ScreeningLinks,
    /// Last time this record was observed; newer records win on conflict
    pub updated_at: DateTime<Utc>,
}

impl Screening {
    /// Create a screening observed now, deriving its ID from the identifying fields.
    pub fn new(
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        cinema: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let cinema = cinema.into();
        let language = language.into();
        let id = ScreeningId::identify(&title, &start, &cinema, &language);

        Self {
            id,
            title,
            description: String::new(),
            language,
            start,
            duration: Duration::ZERO,
            cinema,
            links: ScreeningLinks::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_links(mut self, links: ScreeningLinks) -> Self {
        self.links = links;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn id(&self) -> &ScreeningId {
        &self.id
    }

    /// Whether the stored ID still matches the identifying fields.
    ///
    /// The public fields can be edited after construction, so records coming
    /// from outside the crate are checked before they are stored.
    pub fn identity_matches(&self) -> bool {
        self.id == self.expected_id()
    }

    /// Re-derive the ID from the current identifying fields.
    pub fn reidentify(&mut self) {
        self.id = self.expected_id();
    }

    fn expected_id(&self) -> ScreeningId {
        ScreeningId::identify(&self.title, &self.start, &self.cinema, &self.language)
    }
}
