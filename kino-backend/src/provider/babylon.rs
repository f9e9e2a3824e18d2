//! Kino Babylon programme scraper
//!
//! Parses the programme page (https://babylonberlin.eu/programm). Every
//! screening is an `li` inside `#regridart-207` carrying its start time in
//! `data-date` ("2025-06-01 20:00:00", Berlin time).

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use kino_common::{Provider, ScrapeError, Screening, ScreeningLinks};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

use super::berlin::berlin_time;
use super::fetch_page;

const BABYLON_BASE_URL: &str = "https://babylonberlin.eu";
const CINEMA_NAME: &str = "Kino Babylon";

static RUNTIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*min").expect("runtime pattern is valid"));

pub struct Babylon {
    client: Client,
    base_url: String,
}

impl Babylon {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: BABYLON_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl Provider for Babylon {
    fn name(&self) -> &str {
        CINEMA_NAME
    }

    async fn scrape(&self) -> Result<Vec<Screening>, ScrapeError> {
        let url = format!("{}/programm", self.base_url);
        let html = fetch_page(&self.client, &url).await?;

        let programme = parse_programme(&html, &self.base_url)?;
        tracing::info!(
            "Parsed {} screenings from {} ({} entries skipped)",
            programme.screenings.len(),
            CINEMA_NAME,
            programme.skipped
        );

        if programme.skipped > 0 {
            return Err(ScrapeError::Partial {
                partial: programme.screenings,
                reason: format!("{} programme entries could not be parsed", programme.skipped),
            });
        }

        Ok(programme.screenings)
    }
}

/// Result of parsing one programme page
#[derive(Debug)]
struct Programme {
    screenings: Vec<Screening>,
    /// Film entries that were dropped because their start time was unreadable
    skipped: usize,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector {:?}: {:?}", css, e))
}

fn parse_programme(html: &str, base_url: &str) -> Result<Programme> {
    let document = Html::parse_document(html);

    let list_sel = selector("#regridart-207")?;
    let item_sel = selector("li")?;
    let h3_sel = selector("h3")?;
    let runtime_sel = selector(".runtime")?;
    let title_link_sel = selector(".mix-title")?;
    let thumbnail_sel = selector(".fancybox")?;

    let list = document
        .select(&list_sel)
        .next()
        .ok_or_else(|| anyhow!("Programme list not found on page"))?;

    let observed_at = Utc::now();
    let mut programme = Programme {
        screenings: Vec::new(),
        skipped: 0,
    };

    for item in list.select(&item_sel) {
        let headings: Vec<String> = item.select(&h3_sel).map(|h| element_text(&h)).collect();

        // Film entries have three headings; anything else is layout.
        if headings.len() <= 2 {
            continue;
        }
        let title = headings[2].clone();

        let raw_date = item.value().attr("data-date").unwrap_or_default();
        let Some(start) = parse_start(raw_date) else {
            warn!("Skipping {:?}: unparsable date {:?}", title, raw_date);
            programme.skipped += 1;
            continue;
        };

        let duration = item
            .select(&runtime_sel)
            .next()
            .map(|runtime| parse_runtime(&element_text(&runtime)))
            .unwrap_or(Duration::ZERO);

        let details = item
            .select(&title_link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| format!("{}{}", base_url, href))
            .unwrap_or_default();

        let thumbnail = item
            .select(&thumbnail_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        programme.screenings.push(
            Screening::new(title, start, CINEMA_NAME, "")
                .with_duration(duration)
                .with_links(ScreeningLinks { details, thumbnail })
                .with_updated_at(observed_at),
        );
    }

    Ok(programme)
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_start(raw: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let local = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    berlin_time(local)
}

/// "118 min." -> 118 minutes; anything unreadable or out of range is zero
fn parse_runtime(text: &str) -> Duration {
    let seconds = RUNTIME_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .and_then(|minutes| minutes.checked_mul(60));

    match seconds {
        Some(seconds) => Duration::from_secs(seconds),
        None => {
            warn!("Failed to parse runtime {:?}", text);
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const PROGRAMME_HTML: &str = r#"
        <html><body>
        <ul id="regridart-207">
          <li class="filter-all"><h3>Alle</h3></li>
          <li data-date="2025-06-01 20:00:00">
            <h3>So</h3><h3>01.06.</h3><h3>Der Himmel über Berlin</h3>
            <span class="runtime">128 min.</span>
            <a class="mix-title" href="/film/himmel">mehr</a>
            <a class="fancybox" href="https://babylonberlin.eu/img/himmel.jpg">Bild</a>
          </li>
          <li data-date="2025-12-24 18:30:00">
            <h3>Mi</h3><h3>24.12.</h3><h3>  Die  Feuerzangenbowle </h3>
            <span class="runtime">tba</span>
          </li>
          <li data-date="demnächst">
            <h3>?</h3><h3>?</h3><h3>Geheimfilm</h3>
          </li>
        </ul>
        </body></html>
    "#;

    #[test]
    fn test_parse_programme() {
        let programme = parse_programme(PROGRAMME_HTML, BABYLON_BASE_URL).unwrap();

        assert_eq!(programme.skipped, 1);
        assert_eq!(programme.screenings.len(), 2);

        let himmel = &programme.screenings[0];
        assert_eq!(himmel.title, "Der Himmel über Berlin");
        assert_eq!(himmel.cinema, CINEMA_NAME);
        assert_eq!(himmel.duration, Duration::from_secs(128 * 60));
        assert_eq!(
            himmel.start.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap()
        );
        assert_eq!(himmel.links.details, "https://babylonberlin.eu/film/himmel");
        assert_eq!(himmel.links.thumbnail, "https://babylonberlin.eu/img/himmel.jpg");
        assert!(himmel.identity_matches());

        let bowle = &programme.screenings[1];
        assert_eq!(bowle.title, "Die Feuerzangenbowle");
        assert_eq!(bowle.duration, Duration::ZERO);
        assert_eq!(bowle.start.offset().local_minus_utc(), 3600);
        assert!(bowle.links.details.is_empty());
    }

    #[test]
    fn test_parse_programme_without_list() {
        assert!(parse_programme("<html><body><p>Wartung</p></body></html>", BABYLON_BASE_URL).is_err());
    }

    #[test]
    fn test_parse_runtime() {
        assert_eq!(parse_runtime("95 min."), Duration::from_secs(95 * 60));
        assert_eq!(parse_runtime("Länge: 102min"), Duration::from_secs(102 * 60));
        assert_eq!(parse_runtime("k.A."), Duration::ZERO);
        assert_eq!(parse_runtime("999999999999999999 min."), Duration::ZERO);
    }

    #[test]
    fn test_parse_programme_huge_runtime() {
        let html = r#"
            <ul id="regridart-207">
              <li data-date="2025-06-01 20:00:00">
                <h3>So</h3><h3>01.06.</h3><h3>Satantango</h3>
                <span class="runtime">999999999999999999 min.</span>
              </li>
            </ul>
        "#;

        let programme = parse_programme(html, BABYLON_BASE_URL).unwrap();
        assert_eq!(programme.skipped, 0);
        assert_eq!(programme.screenings.len(), 1);
        assert_eq!(programme.screenings[0].duration, Duration::ZERO);
    }

    #[tokio::test]
    #[ignore] // Requires network connection
    async fn test_scrape_live() {
        let babylon = Babylon::new(super::super::http_client().unwrap());
        let screenings = babylon.scrape().await.unwrap();
        assert!(!screenings.is_empty());
    }
}
