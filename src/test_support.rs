//! In-memory stand-ins for the Postgres stores, used by unit and router tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::extract::FromRef;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::appointments::repo::AppointmentStore;
use crate::appointments::repo_types::{
    AppointmentDraft, AppointmentRow, HydratedAppointment, Participant, ParticipantRow,
    RosterEntry,
};
use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db::StoreError;
use crate::state::AppState;
use crate::users::{User, UserStore, UserSummary};

#[derive(Debug, Clone)]
struct StoredParticipant {
    id: Uuid,
    appointment_id: Uuid,
    user_id: Option<Uuid>,
    email: String,
    is_confirmed: bool,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    appointments: Vec<AppointmentRow>,
    participants: Vec<StoredParticipant>,
    fail_writes: bool,
    email_lookups: usize,
}

/// Both stores behind one mutex. A write holds the lock for its whole unit of
/// work and applies nothing until every row has been staged.
#[derive(Default)]
pub struct MemoryDb {
    inner: Mutex<Inner>,
}

impl MemoryDb {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory db lock")
    }

    pub fn seed_user(&self, name: &str, email: &str) -> UserSummary {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        let summary = UserSummary::from(&user);
        self.lock().users.push(user);
        summary
    }

    /// Make every following write fail as a dropped connection would.
    pub fn fail_writes(&self, on: bool) {
        self.lock().fail_writes = on;
    }

    pub fn email_lookups(&self) -> usize {
        self.lock().email_lookups
    }

    pub fn appointment_count(&self) -> usize {
        self.lock().appointments.len()
    }

    pub fn participant_count(&self) -> usize {
        self.lock().participants.len()
    }

    pub fn participants_snapshot(&self, appointment_id: Uuid) -> Vec<Participant> {
        let inner = self.lock();
        inner.participants_of(appointment_id)
    }

    pub fn hydrated_snapshot(&self, id: Uuid) -> Option<HydratedAppointment> {
        let inner = self.lock();
        inner.hydrate(id)
    }
}

impl Inner {
    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }

    fn user_name(&self, id: Uuid) -> Option<String> {
        self.users.iter().find(|u| u.id == id).map(|u| u.name.clone())
    }

    fn stage_roster(appointment_id: Uuid, roster: &[RosterEntry]) -> Vec<StoredParticipant> {
        roster
            .iter()
            .map(|entry| StoredParticipant {
                id: Uuid::new_v4(),
                appointment_id,
                user_id: entry.invitee.user_id(),
                email: entry.invitee.email().to_string(),
                is_confirmed: entry.is_confirmed,
            })
            .collect()
    }

    fn participants_of(&self, appointment_id: Uuid) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| p.appointment_id == appointment_id)
            .map(|p| {
                Participant::from(ParticipantRow {
                    id: p.id,
                    user_id: p.user_id,
                    email: p.email.clone(),
                    is_confirmed: p.is_confirmed,
                    name: p.user_id.and_then(|id| self.user_name(id)),
                })
            })
            .collect()
    }

    fn hydrate(&self, id: Uuid) -> Option<HydratedAppointment> {
        let row = self.appointments.iter().find(|a| a.id == id)?;
        Some(HydratedAppointment {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            creator_id: row.creator_id,
            creator_name: self.user_name(row.creator_id)?,
            appointment_date: row.appointment_date,
            appointment_time: row.appointment_time,
            duration: row.duration,
            created_at: row.created_at,
            participants: self.participants_of(row.id),
        })
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<UserSummary>, StoreError> {
        let mut inner = self.lock();
        inner.email_lookups += 1;
        Ok(inner
            .users
            .iter()
            .filter(|u| emails.contains(&u.email))
            .map(UserSummary::from)
            .collect())
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if inner.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl AppointmentStore for MemoryDb {
    async fn find(&self, id: Uuid) -> Result<Option<AppointmentRow>, StoreError> {
        Ok(self.lock().appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_with_roster(
        &self,
        creator_id: Uuid,
        draft: &AppointmentDraft,
        roster: &[RosterEntry],
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.lock();
        let id = Uuid::new_v4();
        let row = AppointmentRow {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            creator_id,
            appointment_date: draft.date,
            appointment_time: draft.time,
            duration: draft.duration_minutes,
            created_at: OffsetDateTime::now_utc(),
        };
        let staged = Inner::stage_roster(id, roster);
        inner.check_writable()?;

        inner.appointments.push(row);
        inner.participants.extend(staged);
        Ok(id)
    }

    async fn replace_with_roster(
        &self,
        id: Uuid,
        draft: &AppointmentDraft,
        roster: &[RosterEntry],
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let staged = Inner::stage_roster(id, roster);
        inner.check_writable()?;

        let Some(row) = inner.appointments.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        row.title = draft.title.clone();
        row.description = draft.description.clone();
        row.appointment_date = draft.date;
        row.appointment_time = draft.time;
        row.duration = draft.duration_minutes;

        inner.participants.retain(|p| p.appointment_id != id);
        inner.participants.extend(staged);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let before = inner.appointments.len();
        inner.appointments.retain(|a| a.id != id);
        if inner.appointments.len() == before {
            return Ok(false);
        }
        inner.participants.retain(|p| p.appointment_id != id);
        Ok(true)
    }

    async fn hydrated(&self, id: Uuid) -> Result<Option<HydratedAppointment>, StoreError> {
        Ok(self.lock().hydrate(id))
    }

    async fn list_visible_on(
        &self,
        user_id: Uuid,
        email: &str,
        date: Date,
    ) -> Result<Vec<HydratedAppointment>, StoreError> {
        let inner = self.lock();
        let mut list: Vec<HydratedAppointment> = inner
            .appointments
            .iter()
            .filter(|a| a.appointment_date == date)
            .filter_map(|a| inner.hydrate(a.id))
            .filter(|a| a.is_visible_to(user_id, email))
            .collect();
        list.sort_by_key(|a| (a.appointment_time, a.created_at));
        Ok(list)
    }
}

/// App state wired to an in-memory database.
pub fn test_state(db: &Arc<MemoryDb>) -> AppState {
    AppState::from_parts(Arc::new(AppConfig::for_tests()), db.clone(), db.clone())
}

/// `Authorization` header value carrying an access token for `user`.
pub fn bearer_for(state: &AppState, user: &UserSummary) -> String {
    let keys = JwtKeys::from_ref(state);
    let token = keys
        .sign_access(user.id, &user.email)
        .expect("sign access token");
    format!("Bearer {token}")
}
