use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use tracing::debug;
use uuid::Uuid;

use crate::appointments::repo_types::{
    AppointmentDraft, AppointmentRow, HydratedAppointment, HydratedRow, RosterEntry,
};
use crate::db::StoreError;

/// Owns `appointments` and `appointment_participants`.
///
/// Every write method is one unit of work: the appointment row and its roster
/// are committed together or not at all.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<AppointmentRow>, StoreError>;

    /// Inserts the appointment then its roster, returning the new id.
    async fn insert_with_roster(
        &self,
        creator_id: Uuid,
        draft: &AppointmentDraft,
        roster: &[RosterEntry],
    ) -> Result<Uuid, StoreError>;

    /// Updates the mutable fields and swaps the whole roster. Returns `false`
    /// if the appointment no longer exists.
    async fn replace_with_roster(
        &self,
        id: Uuid,
        draft: &AppointmentDraft,
        roster: &[RosterEntry],
    ) -> Result<bool, StoreError>;

    /// Deletes the appointment and every participant row it owns.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn hydrated(&self, id: Uuid) -> Result<Option<HydratedAppointment>, StoreError>;

    /// Appointments on `date` where the user is creator, or a participant by
    /// id or by email. Ordered by time of day.
    async fn list_visible_on(
        &self,
        user_id: Uuid,
        email: &str,
        date: Date,
    ) -> Result<Vec<HydratedAppointment>, StoreError>;
}

#[derive(Clone)]
pub struct PgAppointmentStore {
    db: PgPool,
}

impl PgAppointmentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const HYDRATED_SELECT: &str = r#"
    SELECT a.id, a.title, a.description, a.creator_id, u.name AS creator_name,
           a.appointment_date, a.appointment_time, a.duration, a.created_at,
           COALESCE(
               json_agg(
                   json_build_object(
                       'id', ap.id,
                       'user_id', ap.user_id,
                       'email', ap.email,
                       'is_confirmed', ap.is_confirmed,
                       'name', pu.name
                   ) ORDER BY ap.position
               ) FILTER (WHERE ap.id IS NOT NULL),
               '[]'
           ) AS participants
      FROM appointments a
      JOIN users u ON u.id = a.creator_id
      LEFT JOIN appointment_participants ap ON ap.appointment_id = a.id
      LEFT JOIN users pu ON pu.id = ap.user_id
"#;

/// Insert one participant row within a transaction.
async fn insert_participant_tx(
    tx: &mut Transaction<'_, Postgres>,
    appointment_id: Uuid,
    position: i32,
    entry: &RosterEntry,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO appointment_participants
            (appointment_id, user_id, email, is_confirmed, position)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(appointment_id)
    .bind(entry.invitee.user_id()) // Option<Uuid> → NULL for email-only invitees
    .bind(entry.invitee.email())
    .bind(entry.is_confirmed)
    .bind(position)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_roster_tx(
    tx: &mut Transaction<'_, Postgres>,
    appointment_id: Uuid,
    roster: &[RosterEntry],
) -> Result<(), StoreError> {
    for (position, entry) in (0i32..).zip(roster) {
        insert_participant_tx(tx, appointment_id, position, entry).await?;
    }
    Ok(())
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn find(&self, id: Uuid) -> Result<Option<AppointmentRow>, StoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT id, title, description, creator_id, appointment_date,
                   appointment_time, duration, created_at
              FROM appointments
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_with_roster(
        &self,
        creator_id: Uuid,
        draft: &AppointmentDraft,
        roster: &[RosterEntry],
    ) -> Result<Uuid, StoreError> {
        let mut tx = self.db.begin().await?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO appointments
                (title, description, creator_id, appointment_date, appointment_time, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(creator_id)
        .bind(draft.date)
        .bind(draft.time)
        .bind(draft.duration_minutes)
        .fetch_one(&mut *tx)
        .await?;

        insert_roster_tx(&mut tx, id, roster).await?;
        tx.commit().await?;

        debug!(appointment_id = %id, rows = roster.len(), "appointment inserted");
        Ok(id)
    }

    async fn replace_with_roster(
        &self,
        id: Uuid,
        draft: &AppointmentDraft,
        roster: &[RosterEntry],
    ) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;

        // Updating the row first takes its lock, serializing concurrent writers
        // before the roster is touched.
        let updated = sqlx::query(
            r#"
            UPDATE appointments
               SET title = $2,
                   description = $3,
                   appointment_date = $4,
                   appointment_time = $5,
                   duration = $6
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.date)
        .bind(draft.time)
        .bind(draft.duration_minutes)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM appointment_participants WHERE appointment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_roster_tx(&mut tx, id, roster).await?;
        tx.commit().await?;

        debug!(appointment_id = %id, rows = roster.len(), "roster replaced");
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        // participants go with it through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn hydrated(&self, id: Uuid) -> Result<Option<HydratedAppointment>, StoreError> {
        let sql = format!("{HYDRATED_SELECT} WHERE a.id = $1 GROUP BY a.id, u.name");
        let row = sqlx::query_as::<_, HydratedRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(HydratedAppointment::from))
    }

    async fn list_visible_on(
        &self,
        user_id: Uuid,
        email: &str,
        date: Date,
    ) -> Result<Vec<HydratedAppointment>, StoreError> {
        let sql = format!(
            r#"{HYDRATED_SELECT}
             WHERE a.appointment_date = $1
               AND (
                   a.creator_id = $2
                   OR EXISTS (
                       SELECT 1 FROM appointment_participants vis
                        WHERE vis.appointment_id = a.id
                          AND (vis.user_id = $2 OR vis.email = $3)
                   )
               )
             GROUP BY a.id, u.name
             ORDER BY a.appointment_time ASC, a.created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, HydratedRow>(&sql)
            .bind(date)
            .bind(user_id)
            .bind(email)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(HydratedAppointment::from).collect())
    }
}
