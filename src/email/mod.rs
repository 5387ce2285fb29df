//! Outbound notifications: message construction, transports and the
//! background dispatcher that keeps delivery off the request path.
mod dispatcher;
mod sender;
pub mod templates;

pub use dispatcher::{DeliveryPolicy, NotificationDispatcher};
pub use sender::{EmailMessage, EmailSender, SandboxEmailSender, SmtpEmailSender};
