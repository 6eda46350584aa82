use std::sync::Arc;

use time::Date;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::appointments::error::BookingError;
use crate::appointments::repo::AppointmentStore;
use crate::appointments::repo_types::HydratedAppointment;

/// Read path for appointments a user can see.
#[derive(Clone)]
pub struct AppointmentQueryService {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentQueryService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Appointments on `date` the user created or is invited to, by account
    /// or by email, earliest first.
    #[instrument(skip(self, user_email))]
    pub async fn list_for_user_on_date(
        &self,
        user_id: Uuid,
        user_email: &str,
        date: Date,
    ) -> Result<Vec<HydratedAppointment>, BookingError> {
        let list = self.store.list_visible_on(user_id, user_email, date).await?;
        debug!(count = list.len(), "appointments listed");
        Ok(list)
    }

    /// One appointment, if the user can see it. Invisible and missing look the
    /// same to the caller.
    #[instrument(skip(self, user_email))]
    pub async fn get_for_user(
        &self,
        user_id: Uuid,
        user_email: &str,
        id: Uuid,
    ) -> Result<HydratedAppointment, BookingError> {
        self.store
            .hydrated(id)
            .await?
            .filter(|a| a.is_visible_to(user_id, user_email))
            .ok_or(BookingError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::dto::{AppointmentInput, ParticipantInput};
    use crate::appointments::resolver::ParticipantResolver;
    use crate::appointments::services::BookingService;
    use crate::test_support::MemoryDb;
    use time::macros::{date, time};

    fn booking(title: &str, day: &str, at: &str, emails: &[&str]) -> AppointmentInput {
        AppointmentInput {
            title: Some(title.into()),
            description: Some("weekly".into()),
            appointment_date: Some(day.into()),
            appointment_time: Some(at.into()),
            duration: Some(30),
            participants: emails
                .iter()
                .map(|e| ParticipantInput {
                    email: (*e).to_string(),
                })
                .collect(),
        }
    }

    fn services(db: &Arc<MemoryDb>) -> (BookingService, AppointmentQueryService) {
        (
            BookingService::new(db.clone(), ParticipantResolver::new(db.clone())),
            AppointmentQueryService::new(db.clone()),
        )
    }

    #[tokio::test]
    async fn sync_scenario_orders_by_time_and_hydrates() {
        let db = Arc::new(MemoryDb::default());
        let u1 = db.seed_user("User One", "u1@x.com");
        let u2 = db.seed_user("User Two", "u2@x.com");
        let (booking_svc, queries) = services(&db);

        booking_svc
            .create(u1.id, booking("Lunch", "2024-06-01", "12:00", &[]))
            .await
            .unwrap();
        booking_svc
            .create(u1.id, booking("Sync", "2024-06-01", "09:00", &["u2@x.com"]))
            .await
            .unwrap();
        booking_svc
            .create(u1.id, booking("Tomorrow", "2024-06-02", "08:00", &[]))
            .await
            .unwrap();

        let day = queries
            .list_for_user_on_date(u1.id, "u1@x.com", date!(2024 - 06 - 01))
            .await
            .unwrap();
        let titles: Vec<&str> = day.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Sync", "Lunch"]);

        let sync = &day[0];
        assert_eq!(sync.appointment_time, time!(9:00));
        assert_eq!(sync.participants.len(), 1);
        assert_eq!(sync.participants[0].email, "u2@x.com");
        assert_eq!(sync.participants[0].user_id(), Some(u2.id));
        assert!(!sync.participants[0].is_confirmed);

        let for_u2 = queries
            .list_for_user_on_date(u2.id, "u2@x.com", date!(2024 - 06 - 01))
            .await
            .unwrap();
        assert_eq!(for_u2.len(), 1);
        assert_eq!(for_u2[0].title, "Sync");
    }

    #[tokio::test]
    async fn email_only_participant_sees_the_appointment() {
        let db = Arc::new(MemoryDb::default());
        let owner = db.seed_user("Owner", "owner@x.com");
        let (booking_svc, queries) = services(&db);

        let created = booking_svc
            .create(owner.id, booking("Intro", "2024-06-01", "15:00", &[]))
            .await
            .unwrap();
        // the update path lets an email without an account onto the roster
        booking_svc
            .update(
                owner.id,
                created.id,
                booking("Intro", "2024-06-01", "15:00", &["newcomer@x.com"]),
            )
            .await
            .unwrap();

        let stranger = Uuid::new_v4();
        let seen = queries
            .list_for_user_on_date(stranger, "newcomer@x.com", date!(2024 - 06 - 01))
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, created.id);

        let nothing = queries
            .list_for_user_on_date(stranger, "other@x.com", date!(2024 - 06 - 01))
            .await
            .unwrap();
        assert!(nothing.is_empty());
    }

    #[tokio::test]
    async fn get_for_user_hides_appointments_of_others() {
        let db = Arc::new(MemoryDb::default());
        let owner = db.seed_user("Owner", "owner@x.com");
        let outsider = db.seed_user("Out", "out@x.com");
        let (booking_svc, queries) = services(&db);

        let created = booking_svc
            .create(owner.id, booking("Private", "2024-06-01", "10:00", &[]))
            .await
            .unwrap();

        let own = queries
            .get_for_user(owner.id, "owner@x.com", created.id)
            .await
            .unwrap();
        assert_eq!(own.title, "Private");

        let err = queries
            .get_for_user(outsider.id, "out@x.com", created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound));
    }
}
