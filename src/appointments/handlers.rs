use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{auth::AuthUser, state::AppState};

use super::dto::{AppointmentInput, AppointmentView, DateQuery, MutationResponse};
use super::error::BookingError;
use super::services::parse_date;

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/appointments/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
}

fn read_body(
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<AppointmentInput, BookingError> {
    payload.map(|Json(body)| body).map_err(|e| {
        warn!(error = %e, "rejected appointment body");
        BookingError::validation("Invalid request body")
    })
}

/// An id that is not a UUID names no appointment.
fn read_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, BookingError> {
    id.map(|Path(id)| id).map_err(|e| {
        warn!(error = %e, "rejected appointment id");
        BookingError::NotFound
    })
}

/// GET /appointments?date=YYYY-MM-DD
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<DateQuery>,
) -> Result<Json<Vec<AppointmentView>>, BookingError> {
    let raw = q
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| BookingError::validation("Date is required"))?;
    let date = parse_date(raw.trim())
        .ok_or_else(|| BookingError::validation("Invalid date, expected YYYY-MM-DD"))?;

    let list = state
        .queries
        .list_for_user_on_date(auth.id, &auth.email, date)
        .await?;
    Ok(Json(list.into_iter().map(AppointmentView::from).collect()))
}

#[instrument(skip(state, auth, id), fields(user_id = %auth.id))]
pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AppointmentView>, BookingError> {
    let id = read_id(id)?;
    let appointment = state.queries.get_for_user(auth.id, &auth.email, id).await?;
    Ok(Json(AppointmentView::from(appointment)))
}

/// POST /appointments
#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<MutationResponse>), BookingError> {
    let input = read_body(payload)?;
    let appointment = state.booking.create(auth.id, input).await?;

    let mut headers = HeaderMap::new();
    let location = format!("/api/appointments/{}", appointment.id);
    if let Ok(location) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(MutationResponse {
            success: true,
            message: "Appointment created successfully",
            appointment: Some(AppointmentView::from(appointment)),
        }),
    ))
}

/// PUT /appointments/:id
#[instrument(skip(state, auth, id, payload), fields(user_id = %auth.id))]
pub async fn update_appointment(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<Json<MutationResponse>, BookingError> {
    let id = read_id(id)?;
    let input = read_body(payload)?;
    let appointment = state.booking.update(auth.id, id, input).await?;
    Ok(Json(MutationResponse {
        success: true,
        message: "Appointment updated successfully",
        appointment: Some(AppointmentView::from(appointment)),
    }))
}

/// DELETE /appointments/:id
#[instrument(skip(state, auth, id), fields(user_id = %auth.id))]
pub async fn delete_appointment(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MutationResponse>, BookingError> {
    let id = read_id(id)?;
    state.booking.delete(auth.id, id).await?;
    Ok(Json(MutationResponse {
        success: true,
        message: "Appointment deleted successfully",
        appointment: None,
    }))
}
