//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::BookingRepository;
use crate::services::MailQueue;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// booking store and the outgoing mail queue.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    repo: Arc<dyn BookingRepository>,
    mail: MailQueue,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `repo` - Store for rooms, reservations and staff accounts
    /// * `mail` - Sending half of the mail worker's channel
    #[must_use]
    pub fn new(repo: Arc<dyn BookingRepository>, mail: MailQueue) -> Self {
        Self {
            inner: Arc::new(AppStateInner { repo, mail }),
        }
    }

    /// Get a reference to the booking repository.
    #[must_use]
    pub fn repo(&self) -> &dyn BookingRepository {
        self.inner.repo.as_ref()
    }

    /// Get a reference to the mail queue.
    #[must_use]
    pub fn mail(&self) -> &MailQueue {
        &self.inner.mail
    }
}
