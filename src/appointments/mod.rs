use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub mod handlers;
pub mod queries;
pub mod repo;
pub mod repo_types;
pub mod resolver;
pub mod services;

pub use queries::AppointmentQueryService;
pub use repo::{AppointmentStore, PgAppointmentStore};
pub use resolver::ParticipantResolver;
pub use services::BookingService;

pub fn router() -> Router<AppState> {
    handlers::appointment_routes()
}
