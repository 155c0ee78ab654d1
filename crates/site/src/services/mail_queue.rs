//! Fire-and-forget mail delivery.
//!
//! Handlers push rendered messages into a bounded channel and return
//! immediately. A single background worker drains the channel, so a slow or
//! unreachable SMTP server only ever delays that worker.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lodge_core::Email;

use super::email::{self, BookingNotice, MailMessage, Mailer};

/// Messages that can wait for the worker before new ones are dropped.
pub const MAIL_QUEUE_CAPACITY: usize = 100;

/// Sending half of the mail channel. Cheap to clone.
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<MailMessage>,
    owner: Email,
}

impl MailQueue {
    /// Create a queue and the receiver its worker should drain.
    #[must_use]
    pub fn new(owner: Email) -> (Self, mpsc::Receiver<MailMessage>) {
        let (sender, receiver) = mpsc::channel(MAIL_QUEUE_CAPACITY);
        (Self { sender, owner }, receiver)
    }

    /// Queue a message without waiting.
    ///
    /// Returns `false` if the message was dropped because the queue is full or
    /// the worker has stopped.
    pub fn enqueue(&self, message: MailMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::warn!(to = %message.to, subject = %message.subject, "Mail queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                tracing::error!(to = %message.to, subject = %message.subject, "Mail worker stopped, dropping message");
                false
            }
        }
    }

    /// Queue the guest confirmation and the owner notification for a booking.
    ///
    /// Rendering failures are logged; the booking itself already succeeded.
    pub fn booking_confirmed(&self, notice: &BookingNotice<'_>) {
        match email::guest_confirmation(notice) {
            Ok(message) => {
                self.enqueue(message);
            }
            Err(e) => tracing::error!(error = %e, "Failed to render guest confirmation"),
        }
        match email::owner_notification(notice, &self.owner) {
            Ok(message) => {
                self.enqueue(message);
            }
            Err(e) => tracing::error!(error = %e, "Failed to render owner notification"),
        }
    }
}

/// Spawn the worker that delivers queued messages.
///
/// The worker exits once every [`MailQueue`] clone has been dropped and the
/// channel is drained.
pub fn spawn_worker(
    mut receiver: mpsc::Receiver<MailMessage>,
    mailer: Arc<dyn Mailer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Mail worker started");
        while let Some(message) = receiver.recv().await {
            if let Err(e) = mailer.send(&message).await {
                tracing::error!(
                    error = %e,
                    to = %message.to,
                    subject = %message.subject,
                    "Failed to send email"
                );
            }
        }
        tracing::info!("Mail worker stopped");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    use lodge_core::{ReservationId, StayRange};

    use super::*;
    use crate::models::GuestDetails;
    use crate::services::email::EmailError;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), EmailError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn message(to: &str) -> MailMessage {
        MailMessage {
            to: Email::parse(to).unwrap(),
            subject: "hello".to_string(),
            text: "hi".to_string(),
            html: "<p>hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_booking_mail_to_guest_and_owner() {
        let owner = Email::parse("owner@example.com").unwrap();
        let (queue, receiver) = MailQueue::new(owner.clone());
        let mailer = Arc::new(RecordingMailer::default());
        let worker = spawn_worker(receiver, mailer.clone());

        let guest = GuestDetails {
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: Email::parse("alan@example.com").unwrap(),
            phone: "555-0199".to_string(),
        };
        let stay = StayRange::new(
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 3).unwrap(),
        )
        .unwrap();
        queue.booking_confirmed(&BookingNotice {
            reservation_id: ReservationId::new(1),
            guest: &guest,
            room_name: "Garden Room",
            stay,
        });

        drop(queue);
        worker.await.unwrap();

        let sent = mailer.sent.lock().await;
        let recipients: Vec<&str> = sent.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(recipients, vec!["alan@example.com", "owner@example.com"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (queue, _receiver) = MailQueue::new(Email::parse("owner@example.com").unwrap());
        for _ in 0..MAIL_QUEUE_CAPACITY {
            assert!(queue.enqueue(message("a@example.com")));
        }
        assert!(!queue.enqueue(message("b@example.com")));
    }

    #[tokio::test]
    async fn test_closed_queue_drops() {
        let (queue, receiver) = MailQueue::new(Email::parse("owner@example.com").unwrap());
        drop(receiver);
        assert!(!queue.enqueue(message("a@example.com")));
    }
}
