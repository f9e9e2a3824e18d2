use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use kino_common::AppError;
use kino_common::filter::{cinema_filter, date_filter, expired_filter, expired_screening_filter};
use tracing::{error, warn};

use super::DeliveryState;
use super::model::{ScreeningQuery, ScreeningView, SelectsView};

/// Any application error; only the log sees the detail
pub struct HandlerError(AppError);

impl From<AppError> for HandlerError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn selects(State(state): State<DeliveryState>) -> Result<Json<SelectsView>, HandlerError> {
    let cinemas = state.app.get_available_cinemas().await?;
    let dates = state.app.get_available_dates().await?;

    Ok(Json(SelectsView::new(cinemas, &dates)))
}

pub async fn screenings(
    State(state): State<DeliveryState>,
    Query(query): Query<ScreeningQuery>,
) -> Result<Json<Vec<ScreeningView>>, HandlerError> {
    let mut filters = vec![expired_filter(state.max_age), expired_screening_filter()];

    if let Some(raw) = query.dates.as_deref().filter(|d| !d.is_empty()) {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(day) => filters.push(date_filter(day)),
            Err(e) => warn!("Ignoring unparsable date {:?}: {}", raw, e),
        }
    }

    if let Some(cinema) = query.cinemas.filter(|c| !c.is_empty()) {
        filters.push(cinema_filter(cinema));
    }

    let screenings = state.app.fetch_screenings(&filters).await?;

    Ok(Json(screenings.into_iter().map(ScreeningView::from).collect()))
}
