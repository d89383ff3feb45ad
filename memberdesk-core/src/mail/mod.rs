//! Force password reset mail
//!
//! When an operator mails a reset password, the member receives a mail with
//! the new password and a link to the console. Delivery failures are logged
//! and never propagated: the password has already been changed by then.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use crate::config::DEFAULT_CONSOLE_WEB_URL;

/// Errors returned by a [`Mailer`]
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Kinds of templated mail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailKind {
    ForcePasswordReset,
}

/// Template variables of the force password reset mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetContext {
    pub email: String,
    pub password: String,
    pub url: String,
}

/// A templated mail ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub kind: MailKind,
    pub language: String,
    pub to: String,
    pub context: PasswordResetContext,
}

/// Outgoing mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether a transport is configured. Uninitialized mailers drop mail.
    fn is_initialized(&self) -> bool;

    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Mail the new password to `to`.
///
/// Does nothing when the mailer has no transport. An empty
/// `console_web_url` falls back to [`DEFAULT_CONSOLE_WEB_URL`].
pub async fn send_force_password_reset_mail(
    mailer: &dyn Mailer,
    language: &str,
    to: &str,
    new_password: &str,
    console_web_url: &str,
) {
    if !mailer.is_initialized() {
        return;
    }

    info!(to, "start force password reset mail");
    let started = Instant::now();

    let url = if console_web_url.is_empty() {
        DEFAULT_CONSOLE_WEB_URL
    } else {
        console_web_url
    };

    let message = MailMessage {
        kind: MailKind::ForcePasswordReset,
        language: language.to_string(),
        to: to.to_string(),
        context: PasswordResetContext {
            email: to.to_string(),
            password: new_password.to_string(),
            url: url.to_string(),
        },
    };

    match mailer.send(message).await {
        Ok(()) => info!(
            to,
            latency_ms = started.elapsed().as_millis() as u64,
            "force password reset mail sent"
        ),
        Err(e) => error!(to, error = %e, "force password reset mail failed"),
    }
}

/// Mailer that keeps delivered mail in memory
#[derive(Debug)]
pub struct MemoryMailer {
    initialized: bool,
    sent: Mutex<Vec<MailMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self {
            initialized: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Mailer without a transport; every send is skipped
    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for MemoryMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if !message.to.contains('@') {
            return Err(MailError::InvalidRecipient(message.to));
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(message);
        Ok(())
    }
}
