//! Outgoing email for account and booking lifecycle events.
//!
//! Sending is best-effort everywhere it is called from a handler: a
//! failed SMTP delivery is logged and never fails the request.

mod email;

pub use email::SystemEmailService;
