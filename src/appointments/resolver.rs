use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::appointments::error::BookingError;
use crate::appointments::repo_types::Invitee;
use crate::db::StoreError;
use crate::users::{UserStore, UserSummary};

/// Maps participant emails to registered accounts.
#[derive(Clone)]
pub struct ParticipantResolver {
    users: Arc<dyn UserStore>,
}

/// Outcome of one batched lookup.
#[derive(Debug, Default)]
pub struct Resolution {
    known: HashMap<String, UserSummary>,
    unknown: Vec<String>,
}

impl ParticipantResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Looks up every distinct email in a single query.
    pub async fn resolve(&self, emails: &[String]) -> Result<Resolution, StoreError> {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = emails
            .iter()
            .filter(|e| seen.insert(e.as_str()))
            .cloned()
            .collect();
        if distinct.is_empty() {
            return Ok(Resolution::default());
        }

        let found = self.users.find_by_emails(&distinct).await?;
        let known: HashMap<String, UserSummary> =
            found.into_iter().map(|u| (u.email.clone(), u)).collect();
        let unknown = distinct
            .into_iter()
            .filter(|e| !known.contains_key(e))
            .collect::<Vec<_>>();

        debug!(known = known.len(), unknown = unknown.len(), "participants resolved");
        Ok(Resolution { known, unknown })
    }
}

impl Resolution {
    /// Emails with no matching account, first-seen order, no duplicates.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    pub fn user(&self, email: &str) -> Option<&UserSummary> {
        self.known.get(email)
    }

    /// Fails with the full list of unresolved emails if there is any.
    pub fn require_all(self) -> Result<Self, BookingError> {
        if self.unknown.is_empty() {
            Ok(self)
        } else {
            Err(BookingError::UnknownParticipants(self.unknown))
        }
    }

    pub fn invitee(&self, email: &str) -> Invitee {
        match self.user(email) {
            Some(u) => Invitee::Resolved {
                user_id: u.id,
                email: email.to_string(),
            },
            None => Invitee::Unresolved {
                email: email.to_string(),
            },
        }
    }
}
