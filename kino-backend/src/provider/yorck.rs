//! Yorck Kinos scraper
//!
//! The film overview (https://www.yorck.de/filme) is a Next.js page; the
//! full programme is embedded as JSON in its `__NEXT_DATA__` script tag.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use kino_common::{Provider, ScrapeError, Screening, ScreeningLinks};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::berlin::berlin_time;
use super::fetch_page;

const YORCK_BASE_URL: &str = "https://www.yorck.de";
const PROVIDER_NAME: &str = "Yorck Kinos";

const SCRIPT_TAG_BEGIN: &str = r#"<script id="__NEXT_DATA__" type="application/json">"#;
const SCRIPT_TAG_END: &str = "</script>";

pub struct Yorck {
    client: Client,
    base_url: String,
}

impl Yorck {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: YORCK_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl Provider for Yorck {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn scrape(&self) -> Result<Vec<Screening>, ScrapeError> {
        let films_url = format!("{}/filme", self.base_url);
        let html = fetch_page(&self.client, &films_url).await?;

        let json = extract_next_data(&html)?;
        let programme = parse_films(json, &films_url)?;
        tracing::info!(
            "Parsed {} screenings from {} ({} entries skipped)",
            programme.screenings.len(),
            PROVIDER_NAME,
            programme.skipped
        );

        if programme.skipped > 0 {
            return Err(ScrapeError::Partial {
                partial: programme.screenings,
                reason: format!("{} films or sessions could not be parsed", programme.skipped),
            });
        }

        Ok(programme.screenings)
    }
}

// ============ Next.js page model ============

#[derive(Debug, Deserialize)]
struct NextData {
    props: Props,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Props {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    /// Kept raw so one malformed film does not drop the whole page
    #[serde(default)]
    films: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Film {
    fields: FilmFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilmFields {
    title: String,
    #[serde(default)]
    slug: String,
    /// Minutes
    #[serde(default)]
    runtime: Option<u64>,
    #[serde(default)]
    sessions: Vec<Session>,
    #[serde(default)]
    hero_image: Option<HeroImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    fields: SessionFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFields {
    start_time: String,
    cinema: Cinema,
}

#[derive(Debug, Deserialize)]
struct Cinema {
    fields: CinemaFields,
}

#[derive(Debug, Deserialize)]
struct CinemaFields {
    name: String,
}

#[derive(Debug, Deserialize)]
struct HeroImage {
    fields: HeroImageFields,
}

#[derive(Debug, Deserialize)]
struct HeroImageFields {
    image: Image,
}

#[derive(Debug, Deserialize)]
struct Image {
    fields: ImageFields,
}

#[derive(Debug, Deserialize)]
struct ImageFields {
    file: ImageFile,
}

#[derive(Debug, Deserialize)]
struct ImageFile {
    url: String,
}

// ============ Parsing ============

#[derive(Debug)]
struct Programme {
    screenings: Vec<Screening>,
    skipped: usize,
}

fn extract_next_data(html: &str) -> Result<&str> {
    let begin = html
        .find(SCRIPT_TAG_BEGIN)
        .ok_or_else(|| anyhow!("Finding begin of film data"))?
        + SCRIPT_TAG_BEGIN.len();

    let end = html[begin..]
        .find(SCRIPT_TAG_END)
        .ok_or_else(|| anyhow!("Finding end of film data"))?;

    Ok(&html[begin..begin + end])
}

fn parse_films(json: &str, films_url: &str) -> Result<Programme> {
    let data: NextData = serde_json::from_str(json).context("Failed to parse film data")?;

    let observed_at = Utc::now();
    let mut programme = Programme {
        screenings: Vec::new(),
        skipped: 0,
    };

    for raw in data.props.page_props.films {
        let film = match serde_json::from_value::<Film>(raw) {
            Ok(film) => film.fields,
            Err(e) => {
                warn!("Skipping malformed Yorck film: {}", e);
                programme.skipped += 1;
                continue;
            }
        };

        let duration = match film.runtime.map(|minutes| minutes.checked_mul(60)) {
            Some(Some(seconds)) => Duration::from_secs(seconds),
            Some(None) => {
                warn!("Ignoring out-of-range runtime of {:?}", film.title);
                Duration::ZERO
            }
            None => Duration::ZERO,
        };
        let details = format!("{}/{}", films_url, film.slug);
        let thumbnail = film
            .hero_image
            .as_ref()
            .and_then(|hero| thumbnail_link(&hero.fields.image.fields.file.url))
            .unwrap_or_default();

        for session in &film.sessions {
            let Some(start) = parse_start(&session.fields.start_time) else {
                warn!(
                    "Skipping session of {:?}: unparsable start {:?}",
                    film.title, session.fields.start_time
                );
                programme.skipped += 1;
                continue;
            };

            programme.screenings.push(
                Screening::new(film.title.clone(), start, session.fields.cinema.fields.name.clone(), "")
                    .with_duration(duration)
                    .with_links(ScreeningLinks {
                        details: details.clone(),
                        thumbnail: thumbnail.clone(),
                    })
                    .with_updated_at(observed_at),
            );
        }
    }

    Ok(programme)
}

/// Take the wall-clock part of a session start and read it as Berlin time.
fn parse_start(raw: &str) -> Option<DateTime<FixedOffset>> {
    let local = match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.naive_local(),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .ok()?,
    };

    berlin_time(local)
}

/// Protocol-relative image URL -> resized https thumbnail
fn thumbnail_link(image_url: &str) -> Option<String> {
    let mut url = Url::parse(&format!("https:{}", image_url)).ok()?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "w" && key != "q")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("q", "75")
        .append_pair("w", "480");

    Some(url.to_string())
}
