//! Booking emails: rendering and SMTP delivery.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Messages are
//! rendered in the request handler and handed to the
//! [`MailQueue`](super::mail_queue::MailQueue); only the worker talks to SMTP.

use std::time::Duration;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use lodge_core::{Email, ReservationId, StayRange};

use crate::config::MailConfig;
use crate::filters;
use crate::models::GuestDetails;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTML confirmation sent to the guest.
#[derive(Template)]
#[template(path = "email/reservation_confirmation.html")]
struct GuestConfirmationHtml<'a> {
    notice: &'a BookingNotice<'a>,
}

/// Plain text confirmation sent to the guest.
#[derive(Template)]
#[template(path = "email/reservation_confirmation.txt")]
struct GuestConfirmationText<'a> {
    notice: &'a BookingNotice<'a>,
}

/// HTML new-booking notice sent to the owner.
#[derive(Template)]
#[template(path = "email/owner_notification.html")]
struct OwnerNotificationHtml<'a> {
    notice: &'a BookingNotice<'a>,
}

/// Plain text new-booking notice sent to the owner.
#[derive(Template)]
#[template(path = "email/owner_notification.txt")]
struct OwnerNotificationText<'a> {
    notice: &'a BookingNotice<'a>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Email,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// What a stored booking looks like to the mail templates.
#[derive(Debug, Clone, Copy)]
pub struct BookingNotice<'a> {
    pub reservation_id: ReservationId,
    pub guest: &'a GuestDetails,
    pub room_name: &'a str,
    pub stay: StayRange,
}

impl BookingNotice<'_> {
    fn arrival(&self) -> String {
        filters::display_date(self.stay.start())
    }

    fn departure(&self) -> String {
        filters::display_date(self.stay.end())
    }
}

/// Render the guest's confirmation.
///
/// # Errors
///
/// Returns [`EmailError::Template`] if rendering fails.
pub fn guest_confirmation(notice: &BookingNotice<'_>) -> Result<MailMessage, EmailError> {
    Ok(MailMessage {
        to: notice.guest.email.clone(),
        subject: format!("Your reservation at Lodge (#{})", notice.reservation_id),
        text: GuestConfirmationText { notice }.render()?,
        html: GuestConfirmationHtml { notice }.render()?,
    })
}

/// Render the owner's new-booking notice.
///
/// # Errors
///
/// Returns [`EmailError::Template`] if rendering fails.
pub fn owner_notification(
    notice: &BookingNotice<'_>,
    owner: &Email,
) -> Result<MailMessage, EmailError> {
    Ok(MailMessage {
        to: owner.clone(),
        subject: format!(
            "New reservation: {} in {}",
            notice.guest.full_name(),
            notice.room_name
        ),
        text: OwnerNotificationText { notice }.render()?,
        html: OwnerNotificationHtml { notice }.render()?,
    })
}

/// Delivers rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), EmailError>;
}

/// SMTP delivery via lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// With credentials the relay is reached over STARTTLS. Without them the
    /// connection is plain, which suits a local catcher on port 1025.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay cannot be configured or the sender
    /// address is invalid.
    pub fn new(config: &MailConfig) -> Result<Self, EmailError> {
        let transport = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(
                        username.clone(),
                        password.expose_secret().to_string(),
                    ))
                    .timeout(Some(SMTP_TIMEOUT))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .timeout(Some(SMTP_TIMEOUT))
                .build(),
        };

        let from = config
            .from
            .as_str()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(config.from.to_string()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), EmailError> {
        let to: Mailbox = message
            .to
            .as_str()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(message.to.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn guest() -> GuestDetails {
        GuestDetails {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Email::parse("grace@example.com").unwrap(),
            phone: String::new(),
        }
    }

    fn stay() -> StayRange {
        StayRange::new(
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 4).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_guest_confirmation_addresses_guest() {
        let guest = guest();
        let notice = BookingNotice {
            reservation_id: ReservationId::new(12),
            guest: &guest,
            room_name: "Garden Room",
            stay: stay(),
        };
        let message = guest_confirmation(&notice).unwrap();
        assert_eq!(message.to.as_str(), "grace@example.com");
        assert!(message.subject.contains("#12"));
        assert!(message.text.contains("Garden Room"));
        assert!(message.text.contains("01-09-2026"));
        assert!(message.html.contains("04-09-2026"));
    }

    #[test]
    fn test_owner_notification_addresses_owner() {
        let guest = guest();
        let notice = BookingNotice {
            reservation_id: ReservationId::new(3),
            guest: &guest,
            room_name: "Garden Room",
            stay: stay(),
        };
        let owner = Email::parse("owner@example.com").unwrap();
        let message = owner_notification(&notice, &owner).unwrap();
        assert_eq!(message.to, owner);
        assert!(message.subject.contains("Grace Hopper"));
        assert!(message.text.contains("grace@example.com"));
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_for_local_catcher() {
        let config = MailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: None,
            smtp_password: None,
            from: Email::parse("bookings@example.com").unwrap(),
            owner: Email::parse("owner@example.com").unwrap(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
