//! Cinema providers
//!
//! Each provider scrapes one website and turns it into `Screening`s.
//! Fetching and parsing are kept apart so the parsers can be tested on
//! fixture documents.

mod babylon;
pub use babylon::Babylon;

mod yorck;
pub use yorck::Yorck;

mod berlin;

use anyhow::{Context, Result, bail};
use kino_common::Provider;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 kino-backend/1.0";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Provider keys accepted in the configuration
pub const KNOWN_PROVIDERS: &[&str] = &["babylon", "yorck"];

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch a page body, treating non-success statuses as errors
async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    tracing::debug!("Fetching {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    if !response.status().is_success() {
        bail!("Failed to fetch {}: HTTP {}", url, response.status());
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// Build providers from their configuration keys, keeping the given order.
pub fn build_providers(names: &[String]) -> Result<Vec<Box<dyn Provider>>> {
    let client = http_client()?;

    names
        .iter()
        .map(|name| -> Result<Box<dyn Provider>> {
            match name.as_str() {
                "babylon" => Ok(Box::new(Babylon::new(client.clone()))),
                "yorck" => Ok(Box::new(Yorck::new(client.clone()))),
                other => bail!(
                    "Unknown provider {:?} (known: {})",
                    other,
                    KNOWN_PROVIDERS.join(", ")
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_providers_keeps_order() {
        let providers = build_providers(&["yorck".to_string(), "babylon".to_string()]).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Yorck Kinos", "Kino Babylon"]);
    }

    #[test]
    fn test_build_providers_rejects_unknown() {
        let err = build_providers(&["babylon".to_string(), "cinemaxx".to_string()]).err().unwrap();
        assert!(err.to_string().contains("cinemaxx"));
    }
}
