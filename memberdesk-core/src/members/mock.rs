//! Test doubles for the manager's collaborators
//!
//! These let hosts and tests drive [`MemberRoleManager`](super::MemberRoleManager)
//! without a network, a clipboard or a UI.

use super::password::GeneratedPassword;
use super::role::Role;
use super::service::{
    Clipboard, ClipboardError, MemberService, NoticeKind, Notifier, ServiceError,
};
use super::types::MemberId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// A request received by [`MockMemberService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    UpdateRole {
        member: MemberId,
        role: Role,
    },
    ResetPassword {
        member: MemberId,
        password: String,
        send_email: bool,
    },
    DeleteOrCancelInvitation {
        member: MemberId,
    },
}

/// Member service that records requests and answers with a scripted outcome
#[derive(Debug, Default)]
pub struct MockMemberService {
    calls: Mutex<Vec<ServiceCall>>,
    failing: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockMemberService {
    /// Service that accepts every request
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that rejects every request
    pub fn failing() -> Self {
        let service = Self::default();
        service.set_failing(true);
        service
    }

    /// Service whose requests stay outstanding until [`release`](Self::release)
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Let `n` held requests complete
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<ServiceCall> {
        lock(&self.calls).clone()
    }

    /// Requests received but not yet answered
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously outstanding requests observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn handle(&self, call: ServiceCall) -> Result<(), ServiceError> {
        lock(&self.calls).push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(ServiceError::Transport("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MemberService for MockMemberService {
    async fn update_role(&self, member_id: &MemberId, role: Role) -> Result<(), ServiceError> {
        self.handle(ServiceCall::UpdateRole {
            member: member_id.clone(),
            role,
        })
        .await
    }

    async fn reset_password(
        &self,
        member_id: &MemberId,
        password: &GeneratedPassword,
        send_email: bool,
    ) -> Result<(), ServiceError> {
        self.handle(ServiceCall::ResetPassword {
            member: member_id.clone(),
            password: password.expose().to_string(),
            send_email,
        })
        .await
    }

    async fn delete_or_cancel_invitation(&self, member_id: &MemberId) -> Result<(), ServiceError> {
        self.handle(ServiceCall::DeleteOrCancelInvitation {
            member: member_id.clone(),
        })
        .await
    }
}

/// Notifier that keeps every notice
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        lock(&self.notices).clone()
    }

    /// Number of notices of `kind`
    pub fn count(&self, kind: NoticeKind) -> usize {
        lock(&self.notices).iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        lock(&self.notices).push((kind, message.to_string()));
    }
}

/// Clipboard that refuses every write
#[derive(Debug, Default, Clone, Copy)]
pub struct DeniedClipboard;

#[async_trait]
impl Clipboard for DeniedClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Denied("clipboard access not granted".to_string()))
    }
}

/// Host refresh callback that counts its invocations
#[derive(Debug, Default, Clone)]
pub struct OperateCounter {
    count: Arc<AtomicUsize>,
}

impl OperateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Callback to hand to the manager
    pub fn callback(&self) -> super::service::OnOperate {
        let count = self.count.clone();
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }
}
