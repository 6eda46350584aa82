use std::sync::Arc;

use time::{format_description::well_known::Rfc3339, macros::format_description};
use time::{Date, OffsetDateTime, Time};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::appointments::dto::AppointmentInput;
use crate::appointments::error::BookingError;
use crate::appointments::repo::AppointmentStore;
use crate::appointments::repo_types::{
    AppointmentDraft, AppointmentRow, HydratedAppointment, RosterEntry, DEFAULT_DURATION_MINUTES,
};
use crate::appointments::resolver::{ParticipantResolver, Resolution};

/// Validates, authorizes and commits appointment mutations.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    resolver: ParticipantResolver,
}

/// Request input after validation: typed fields plus the trimmed, non-empty
/// participant emails in submission order (duplicates kept).
#[derive(Debug)]
struct ValidatedInput {
    draft: AppointmentDraft,
    emails: Vec<String>,
}

impl BookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, resolver: ParticipantResolver) -> Self {
        Self { store, resolver }
    }

    /// Books a new appointment owned by `actor_id`.
    ///
    /// Every participant email must belong to a registered user; otherwise
    /// nothing is written and the full list of unknown emails is returned.
    #[instrument(skip(self, input), fields(actor = %actor_id))]
    pub async fn create(
        &self,
        actor_id: Uuid,
        input: AppointmentInput,
    ) -> Result<HydratedAppointment, BookingError> {
        let ValidatedInput { draft, emails } = validate(input)?;

        let resolution = match self.resolver.resolve(&emails).await?.require_all() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "rejecting booking with unknown participants");
                return Err(e);
            }
        };
        let roster = build_roster(&emails, &resolution, actor_id);

        let id = self
            .store
            .insert_with_roster(actor_id, &draft, &roster)
            .await?;
        info!(appointment_id = %id, participants = roster.len(), "appointment created");

        self.reload(id).await
    }

    /// Rewrites an appointment and replaces its whole roster.
    ///
    /// Unlike [`BookingService::create`], emails without an account are
    /// accepted and stored unresolved. This keeps the long-standing behaviour
    /// of the update endpoint, which lets a creator keep inviting people who
    /// have not signed up yet.
    #[instrument(skip(self, input), fields(actor = %actor_id, appointment_id = %id))]
    pub async fn update(
        &self,
        actor_id: Uuid,
        id: Uuid,
        input: AppointmentInput,
    ) -> Result<HydratedAppointment, BookingError> {
        self.load_owned(actor_id, id, "modify").await?;
        let ValidatedInput { draft, emails } = validate(input)?;

        let resolution = self.resolver.resolve(&emails).await?;
        if !resolution.unknown().is_empty() {
            info!(unknown = ?resolution.unknown(), "storing unresolved participants");
        }
        let roster = build_roster(&emails, &resolution, actor_id);

        if !self.store.replace_with_roster(id, &draft, &roster).await? {
            // deleted between the ownership check and the write
            return Err(BookingError::NotFound);
        }
        info!(participants = roster.len(), "appointment updated");

        self.reload(id).await
    }

    #[instrument(skip(self), fields(actor = %actor_id, appointment_id = %id))]
    pub async fn delete(&self, actor_id: Uuid, id: Uuid) -> Result<(), BookingError> {
        self.load_owned(actor_id, id, "delete").await?;
        if !self.store.delete(id).await? {
            return Err(BookingError::NotFound);
        }
        info!("appointment deleted");
        Ok(())
    }

    async fn load_owned(
        &self,
        actor_id: Uuid,
        id: Uuid,
        action: &'static str,
    ) -> Result<AppointmentRow, BookingError> {
        let existing = self.store.find(id).await?.ok_or(BookingError::NotFound)?;
        if existing.creator_id != actor_id {
            warn!(creator = %existing.creator_id, "non-creator attempted to {action} appointment");
            return Err(BookingError::Forbidden { action });
        }
        Ok(existing)
    }

    async fn reload(&self, id: Uuid) -> Result<HydratedAppointment, BookingError> {
        self.store.hydrated(id).await?.ok_or(BookingError::NotFound)
    }
}

fn build_roster(emails: &[String], resolution: &Resolution, creator_id: Uuid) -> Vec<RosterEntry> {
    emails
        .iter()
        .map(|email| RosterEntry::new(resolution.invitee(email), creator_id))
        .collect()
}

fn validate(input: AppointmentInput) -> Result<ValidatedInput, BookingError> {
    let title = non_empty(input.title);
    let date = non_empty(input.appointment_date);
    let time = non_empty(input.appointment_time);
    let (Some(title), Some(date), Some(time)) = (title, date, time) else {
        return Err(BookingError::validation("Missing information"));
    };

    let date = parse_date(&date)
        .ok_or_else(|| BookingError::validation("Invalid appointmentDate, expected YYYY-MM-DD"))?;
    let time = parse_time(&time)
        .ok_or_else(|| BookingError::validation("Invalid appointmentTime, expected HH:MM"))?;

    let duration_minutes = match input.duration {
        None => DEFAULT_DURATION_MINUTES,
        Some(d) if d > 0 => d,
        Some(_) => {
            return Err(BookingError::validation(
                "Duration must be a positive number of minutes",
            ))
        }
    };

    // Stored account emails are trimmed and lowercased at registration.
    let emails = input
        .participants
        .into_iter()
        .map(|p| p.email.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    Ok(ValidatedInput {
        draft: AppointmentDraft {
            title,
            description: non_empty(input.description),
            date,
            time,
            duration_minutes,
        },
        emails,
    })
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// `YYYY-MM-DD`, or a full RFC 3339 timestamp whose date part is taken as is.
pub(crate) fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(s, &Rfc3339).ok().map(|dt| dt.date()))
}

/// `HH:MM` or `HH:MM:SS`.
pub(crate) fn parse_time(s: &str) -> Option<Time> {
    let full = match s.matches(':').count() {
        1 => format!("{s}:00"),
        2 => s.to_string(),
        _ => return None,
    };
    Time::parse(&full, format_description!("[hour]:[minute]:[second]")).ok()
}
