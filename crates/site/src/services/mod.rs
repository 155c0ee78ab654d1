//! Business services layered over the repository.

pub mod auth;
pub mod email;
pub mod mail_queue;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, MailMessage, Mailer, SmtpMailer};
pub use mail_queue::{MailQueue, spawn_worker};
