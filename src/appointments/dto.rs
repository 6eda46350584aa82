use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::appointments::repo_types::{HydratedAppointment, Participant, ParticipantLink};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(clock_time, Time, "[hour]:[minute]:[second]");

/// Body of POST /appointments and PUT /appointments/:id.
///
/// Fields are optional here so that a missing one surfaces as a validation
/// error with our envelope instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub duration: Option<i32>,
    #[serde(default)]
    pub participants: Vec<ParticipantInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantInput {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub is_confirmed: bool,
    pub name: Option<String>,
}

impl From<Participant> for ParticipantView {
    fn from(p: Participant) -> Self {
        let (user_id, name) = match p.link {
            ParticipantLink::Resolved { user_id, name } => (Some(user_id), Some(name)),
            ParticipantLink::Unresolved => (None, None),
        };
        Self {
            id: p.id,
            user_id,
            email: p.email,
            is_confirmed: p.is_confirmed,
            name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub creator_name: String,
    #[serde(with = "iso_date")]
    pub appointment_date: Date,
    #[serde(with = "clock_time")]
    pub appointment_time: Time,
    pub duration: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub participants: Vec<ParticipantView>,
}

impl From<HydratedAppointment> for AppointmentView {
    fn from(a: HydratedAppointment) -> Self {
        Self {
            id: a.id,
            title: a.title,
            description: a.description,
            creator_id: a.creator_id,
            creator_name: a.creator_name,
            appointment_date: a.appointment_date,
            appointment_time: a.appointment_time,
            duration: a.duration,
            created_at: a.created_at,
            participants: a.participants.into_iter().map(ParticipantView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<AppointmentView>,
}
