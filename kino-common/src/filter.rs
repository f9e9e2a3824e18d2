//! Screening filters
//!
//! A filter returns true if the screening should be kept. Filters passed
//! together are combined with logical AND; an empty set keeps everything.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::screening::Screening;

pub type Filter = Arc<dyn Fn(&Screening) -> bool + Send + Sync>;

/// True if every filter accepts the screening
pub fn matches_all(filters: &[Filter], screening: &Screening) -> bool {
    filters.iter().all(|filter| filter(screening))
}

/// Keep screenings starting on `day`, in the screening's own offset.
pub fn date_filter(day: NaiveDate) -> Filter {
    Arc::new(move |s: &Screening| s.start.date_naive() == day)
}

/// Keep screenings at exactly this cinema.
pub fn cinema_filter(cinema: impl Into<String>) -> Filter {
    let cinema = cinema.into();
    Arc::new(move |s: &Screening| s.cinema == cinema)
}

/// Keep screenings refreshed less than `max_age` ago.
pub fn expired_filter(max_age: Duration) -> Filter {
    Arc::new(move |s: &Screening| is_fresh(s, max_age, Utc::now()))
}

/// Same as [`expired_filter`] with a fixed clock reading.
pub fn expired_filter_at(max_age: Duration, now: DateTime<Utc>) -> Filter {
    Arc::new(move |s: &Screening| is_fresh(s, max_age, now))
}

/// Keep screenings that have not started yet.
pub fn expired_screening_filter() -> Filter {
    Arc::new(|s: &Screening| s.start > Utc::now())
}

/// Same as [`expired_screening_filter`] with a fixed clock reading.
pub fn expired_screening_filter_at(now: DateTime<Utc>) -> Filter {
    Arc::new(move |s: &Screening| s.start > now)
}

fn is_fresh(screening: &Screening, max_age: Duration, now: DateTime<Utc>) -> bool {
    // A record stamped in the future has age zero.
    let age = (now - screening.updated_at).to_std().unwrap_or(Duration::ZERO);
    age < max_age
}
