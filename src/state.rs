use crate::appointments::{
    AppointmentQueryService, AppointmentStore, BookingService, ParticipantResolver,
    PgAppointmentStore,
};
use crate::config::AppConfig;
use crate::users::{PgUserStore, UserStore};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub booking: BookingService,
    pub queries: AppointmentQueryService,
}

impl AppState {
    /// Wires every store to the shared pool. The pool itself stays owned by
    /// the caller, which closes it on shutdown.
    pub fn postgres(config: Arc<AppConfig>, db: PgPool) -> Self {
        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let appointments = Arc::new(PgAppointmentStore::new(db)) as Arc<dyn AppointmentStore>;
        Self::from_parts(config, users, appointments)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        let resolver = ParticipantResolver::new(users.clone());
        Self {
            config,
            users,
            booking: BookingService::new(appointments.clone(), resolver),
            queries: AppointmentQueryService::new(appointments),
        }
    }
}
