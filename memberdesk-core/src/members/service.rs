//! Collaborators consumed by the member manager
//!
//! ```text
//! MemberRoleManager
//!       |
//!       +---> MemberService  (remote: role update, password reset, removal)
//!       +---> Notifier       (user-facing success / error notices)
//!       +---> Clipboard      (copy generated password)
//! ```

use super::password::GeneratedPassword;
use super::role::Role;
use super::types::MemberId;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};

/// Errors returned by a [`MemberService`]
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The member or invitation does not exist
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// The service refused the operation for this member
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}

/// Remote member service, addressed by member id inside the current workspace
#[async_trait]
pub trait MemberService: Send + Sync {
    /// Assign `role` to the member
    async fn update_role(&self, member_id: &MemberId, role: Role) -> Result<(), ServiceError>;

    /// Set the member's credential to `password`. With `send_email`, the
    /// service also mails the password to the member.
    async fn reset_password(
        &self,
        member_id: &MemberId,
        password: &GeneratedPassword,
        send_email: bool,
    ) -> Result<(), ServiceError>;

    /// Remove the member, or cancel the invitation if it is still pending.
    /// The service decides which one applies.
    async fn delete_or_cancel_invitation(&self, member_id: &MemberId) -> Result<(), ServiceError>;
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Messages the manager can show. Rendering them to localized text is up to
/// the host; `as_key` yields the message key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeMessage {
    ActionFailed,
    ModifiedSuccessfully,
    CopySuccessfully,
    CopyFailed,
    PasswordEmailSent,
    PasswordEmailFailed,
}

impl NoticeMessage {
    pub fn as_key(&self) -> &'static str {
        match self {
            NoticeMessage::ActionFailed => "common.actionMsg.actionFailed",
            NoticeMessage::ModifiedSuccessfully => "common.actionMsg.modifiedSuccessfully",
            NoticeMessage::CopySuccessfully => "common.actionMsg.copySuccessfully",
            NoticeMessage::CopyFailed => "common.actionMsg.copyFailed",
            NoticeMessage::PasswordEmailSent => "common.members.passwordEmailSent",
            NoticeMessage::PasswordEmailFailed => "common.members.passwordEmailFailed",
        }
    }
}

impl fmt::Display for NoticeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Sink for user-facing notices (toasts)
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Notifier that turns notices into `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => info!(notice = message, "success"),
            NoticeKind::Error => error!(notice = message, "error"),
        }
    }
}

/// Errors returned by a [`Clipboard`]
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard write denied: {0}")]
    Denied(String),
}

/// System clipboard
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard that keeps the last written text in memory
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last text written, if any
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

/// Host callback run after every successful mutating operation, so the host
/// can refresh its member listing
pub type OnOperate = Arc<dyn Fn() + Send + Sync>;
