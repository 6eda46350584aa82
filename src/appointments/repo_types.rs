use serde::Deserialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;

/// Validated mutable fields of an appointment, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: Date,
    pub time: Time,
    pub duration_minutes: i32,
}

/// A participant on the write path: either linked to an account or known only
/// by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invitee {
    Resolved { user_id: Uuid, email: String },
    Unresolved { email: String },
}

impl Invitee {
    pub fn email(&self) -> &str {
        match self {
            Invitee::Resolved { email, .. } | Invitee::Unresolved { email } => email,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Invitee::Resolved { user_id, .. } => Some(*user_id),
            Invitee::Unresolved { .. } => None,
        }
    }
}

/// One row of a roster about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub invitee: Invitee,
    pub is_confirmed: bool,
}

impl RosterEntry {
    /// The creator confirms themselves by being on their own roster.
    pub fn new(invitee: Invitee, creator_id: Uuid) -> Self {
        let is_confirmed = invitee.user_id() == Some(creator_id);
        Self {
            invitee,
            is_confirmed,
        }
    }
}

/// Bare appointment row, used for existence and ownership checks.
#[derive(Debug, Clone, FromRow)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub appointment_date: Date,
    pub appointment_time: Time,
    pub duration: i32,
    pub created_at: OffsetDateTime,
}

/// A participant on the read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantLink {
    Resolved { user_id: Uuid, name: String },
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: Uuid,
    pub email: String,
    pub is_confirmed: bool,
    pub link: ParticipantLink,
}

impl Participant {
    pub fn user_id(&self) -> Option<Uuid> {
        match &self.link {
            ParticipantLink::Resolved { user_id, .. } => Some(*user_id),
            ParticipantLink::Unresolved => None,
        }
    }
}

/// Participant as aggregated by the hydration queries (nullable columns).
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub is_confirmed: bool,
    pub name: Option<String>,
}

impl From<ParticipantRow> for Participant {
    fn from(r: ParticipantRow) -> Self {
        let link = match r.user_id {
            // user_id is SET NULL when the account goes away, so a linked row
            // always has a joined name
            Some(user_id) => ParticipantLink::Resolved {
                user_id,
                name: r.name.unwrap_or_default(),
            },
            None => ParticipantLink::Unresolved,
        };
        Self {
            id: r.id,
            email: r.email,
            is_confirmed: r.is_confirmed,
            link,
        }
    }
}

/// Appointment joined with its creator's name and full participant list.
#[derive(Debug, Clone)]
pub struct HydratedAppointment {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub appointment_date: Date,
    pub appointment_time: Time,
    pub duration: i32,
    pub created_at: OffsetDateTime,
    pub participants: Vec<Participant>,
}

impl HydratedAppointment {
    /// Creator, or participant matched by account id or by email.
    pub fn is_visible_to(&self, user_id: Uuid, email: &str) -> bool {
        self.creator_id == user_id
            || self
                .participants
                .iter()
                .any(|p| p.user_id() == Some(user_id) || p.email == email)
    }
}

#[derive(Debug, FromRow)]
pub struct HydratedRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub appointment_date: Date,
    pub appointment_time: Time,
    pub duration: i32,
    pub created_at: OffsetDateTime,
    pub participants: sqlx::types::Json<Vec<ParticipantRow>>,
}

impl From<HydratedRow> for HydratedAppointment {
    fn from(r: HydratedRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            creator_id: r.creator_id,
            creator_name: r.creator_name,
            appointment_date: r.appointment_date,
            appointment_time: r.appointment_time,
            duration: r.duration,
            created_at: r.created_at,
            participants: r.participants.0.into_iter().map(Participant::from).collect(),
        }
    }
}
