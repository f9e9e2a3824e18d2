use chrono::{DateTime, FixedOffset, Utc};
use kino_common::Screening;
use serde::{Deserialize, Serialize};

/// Query string of `/api/screenings`
#[derive(Debug, Default, Deserialize)]
pub struct ScreeningQuery {
    /// Day in `YYYY-MM-DD` form
    pub dates: Option<String>,
    pub cinemas: Option<String>,
}

/// Facets for the filter dropdowns
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectsView {
    pub cinemas: Vec<String>,
    /// Days in `YYYY-MM-DD` form, oldest first
    pub dates: Vec<String>,
}

impl SelectsView {
    pub fn new(cinemas: Vec<String>, dates: &[DateTime<Utc>]) -> Self {
        Self {
            cinemas,
            dates: dates
                .iter()
                .map(|date| date.format("%Y-%m-%d").to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScreeningView {
    pub title: String,
    pub cinema: String,
    pub duration_minutes: u64,
    pub start: DateTime<FixedOffset>,
    pub link: String,
    pub thumbnail_link: String,
}

impl From<Screening> for ScreeningView {
    fn from(s: Screening) -> Self {
        Self {
            duration_minutes: s.duration.as_secs() / 60,
            title: s.title,
            cinema: s.cinema,
            start: s.start,
            link: s.links.details,
            thumbnail_link: s.links.thumbnail,
        }
    }
}
