//! Member role management and password reset workflow
//!
//! One [`MemberRoleManager`] backs the operation menu of a single member row.
//! It offers role changes allowed by the [`RolePolicy`], removes members or
//! cancels invitations, and drives the password reset prompts:
//!
//! ```text
//! Idle --open--> ConfirmingReset --confirm ok--> ShowingPassword
//!                     |    \--confirm failed--> Idle (+ error notice)
//!                     \--cancel--> Idle
//! ShowingPassword --copy--> ShowingPassword (copied indicator for 2s)
//! ShowingPassword --email ok--> Idle
//! ShowingPassword --email failed--> ShowingPassword (+ error notice)
//! ShowingPassword --close--> Idle (password discarded)
//! ```
//!
//! A confirmation is only honored while the confirm prompt is open, and
//! only once: the prompt stays in `ConfirmingReset` until the reset request
//! completes, and further confirms in that window are ignored.
//!
//! Operations never return errors. Outcomes surface through the notifier
//! and the `on_operate` callback only. Failed role updates and removals are
//! silent towards the user and only logged.

use super::password::{generate_password, GeneratedPassword};
use super::policy::{RoleMenu, RolePolicy};
use super::role::Role;
use super::service::{
    Clipboard, MemberService, MemoryClipboard, NoticeKind, NoticeMessage, Notifier, OnOperate,
    TracingNotifier,
};
use super::types::Member;
use crate::schedule::DeferredAction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How long the "copied" indicator stays on after a successful copy
pub const COPIED_RESET_DELAY: Duration = Duration::from_secs(2);

/// Visible state of the password reset workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    /// No prompt is open
    Idle,
    /// The "reset password?" confirmation is open
    ConfirmingReset,
    /// The new password is shown
    ShowingPassword,
}

/// At most one prompt is open at a time; the shown password lives inside
/// its prompt so closing the prompt drops it.
enum ResetPrompt {
    Idle,
    ConfirmingReset,
    /// Confirmed; the reset request is outstanding
    Resetting,
    ShowingPassword(GeneratedPassword),
}

impl ResetPrompt {
    fn state(&self) -> ResetState {
        match self {
            ResetPrompt::Idle => ResetState::Idle,
            ResetPrompt::ConfirmingReset | ResetPrompt::Resetting => ResetState::ConfirmingReset,
            ResetPrompt::ShowingPassword(_) => ResetState::ShowingPassword,
        }
    }
}

/// Clears the in-flight flag when the send completes, however it completes
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Returns the prompt to idle if a confirmed reset is abandoned before its
/// request completes
struct PendingReset<'a> {
    prompt: &'a RwLock<ResetPrompt>,
    settled: bool,
}

impl Drop for PendingReset<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(mut prompt) = self.prompt.try_write() {
            if matches!(*prompt, ResetPrompt::Resetting) {
                *prompt = ResetPrompt::Idle;
            }
        }
    }
}

/// Operation menu logic for one workspace member
pub struct MemberRoleManager {
    member: Member,
    operator: Option<Role>,
    policy: RolePolicy,
    service: Arc<dyn MemberService>,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
    on_operate: OnOperate,

    prompt: RwLock<ResetPrompt>,
    copied: Arc<AtomicBool>,
    /// Pending clear of `copied`; dropped (and thereby aborted) with the manager
    copied_reset: Mutex<Option<DeferredAction>>,
    sending_email: AtomicBool,
}

impl MemberRoleManager {
    /// Create a manager for `member`, acted on by an operator holding
    /// `operator` (`None` for a role outside the known set).
    ///
    /// Notices go to a [`TracingNotifier`], copies to a [`MemoryClipboard`]
    /// and the refresh callback does nothing until replaced.
    pub fn new(
        member: Member,
        operator: Option<Role>,
        policy: RolePolicy,
        service: Arc<dyn MemberService>,
    ) -> Self {
        Self {
            member,
            operator,
            policy,
            service,
            notifier: Arc::new(TracingNotifier),
            clipboard: Arc::new(MemoryClipboard::new()),
            on_operate: Arc::new(|| {}),
            prompt: RwLock::new(ResetPrompt::Idle),
            copied: Arc::new(AtomicBool::new(false)),
            copied_reset: Mutex::new(None),
            sending_email: AtomicBool::new(false),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Callback run after every successful role update or removal
    pub fn on_operate(mut self, on_operate: OnOperate) -> Self {
        self.on_operate = on_operate;
        self
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Roles the operator may assign to this member
    pub fn assignable_roles(&self) -> Vec<Role> {
        self.policy.assignable_roles(self.operator)
    }

    /// Menu model for this member row
    pub fn role_menu(&self) -> RoleMenu {
        self.policy.menu(&self.member, self.operator)
    }

    /// Ask the service to give the member `role`.
    ///
    /// The role is not re-checked against [`assignable_roles`](Self::assignable_roles);
    /// the service decides.
    pub async fn update_role(&self, role: Role) {
        match self.service.update_role(&self.member.id, role).await {
            Ok(()) => {
                info!(member = %self.member.id, %role, "member role updated");
                (self.on_operate)();
                self.notify(NoticeKind::Success, NoticeMessage::ModifiedSuccessfully);
            }
            Err(e) => {
                // No user-facing notice for this failure.
                warn!(member = %self.member.id, %role, error = %e, "member role update failed");
            }
        }
    }

    /// Remove the member, or cancel the invitation if it is still pending
    pub async fn delete_or_cancel_invitation(&self) {
        match self.service.delete_or_cancel_invitation(&self.member.id).await {
            Ok(()) => {
                info!(member = %self.member.id, "member removed or invitation cancelled");
                (self.on_operate)();
                self.notify(NoticeKind::Success, NoticeMessage::ModifiedSuccessfully);
            }
            Err(e) => {
                // No user-facing notice for this failure.
                warn!(member = %self.member.id, error = %e, "member removal failed");
            }
        }
    }

    /// Open the reset confirmation. Only possible while no prompt is open;
    /// returns whether the prompt opened.
    pub async fn open_reset_prompt(&self) -> bool {
        let mut prompt = self.prompt.write().await;
        match *prompt {
            ResetPrompt::Idle => {
                *prompt = ResetPrompt::ConfirmingReset;
                true
            }
            _ => false,
        }
    }

    /// Dismiss the reset confirmation without resetting
    pub async fn cancel_reset(&self) {
        let mut prompt = self.prompt.write().await;
        if matches!(*prompt, ResetPrompt::ConfirmingReset) {
            *prompt = ResetPrompt::Idle;
        }
    }

    /// Confirm the reset: generate a new password and set it on the service.
    ///
    /// Ignored unless the confirm prompt is open and no confirmed reset is
    /// outstanding. On success the password is shown; on failure an error
    /// notice is shown and the workflow returns to idle. Failed resets are
    /// not retried.
    pub async fn reset_password(&self) {
        {
            let mut prompt = self.prompt.write().await;
            if !matches!(*prompt, ResetPrompt::ConfirmingReset) {
                debug!(member = %self.member.id, state = ?prompt.state(), "reset confirmation ignored");
                return;
            }
            *prompt = ResetPrompt::Resetting;
        }
        let mut pending = PendingReset {
            prompt: &self.prompt,
            settled: false,
        };

        let password = generate_password();
        let result = self.service.reset_password(&self.member.id, &password, false).await;

        let mut prompt = self.prompt.write().await;
        pending.settled = true;
        match result {
            Ok(()) => {
                info!(member = %self.member.id, "member password reset");
                *prompt = ResetPrompt::ShowingPassword(password);
                drop(prompt);
                self.clear_copied();
            }
            Err(e) => {
                warn!(member = %self.member.id, error = %e, "member password reset failed");
                *prompt = ResetPrompt::Idle;
                drop(prompt);
                self.notify(NoticeKind::Error, NoticeMessage::ActionFailed);
            }
        }
    }

    /// Copy the shown password to the clipboard
    pub async fn copy_generated_password(&self) {
        let Some(password) = self.generated_password().await else {
            debug!(member = %self.member.id, "no generated password to copy");
            return;
        };

        match self.clipboard.write_text(password.expose()).await {
            Ok(()) => {
                self.copied.store(true, Ordering::SeqCst);
                self.notify(NoticeKind::Success, NoticeMessage::CopySuccessfully);
                self.schedule_copied_reset();
            }
            Err(e) => {
                debug!(member = %self.member.id, error = %e, "clipboard write failed");
                self.notify(NoticeKind::Error, NoticeMessage::CopyFailed);
            }
        }
    }

    /// Ask the service to mail the shown password to the member.
    ///
    /// Ignored while a previous send is still outstanding.
    pub async fn send_password_by_email(&self) {
        let Some(password) = self.generated_password().await else {
            debug!(member = %self.member.id, "no generated password to send");
            return;
        };

        if self
            .sending_email
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(member = %self.member.id, "password email already in flight");
            return;
        }
        let _in_flight = InFlight(&self.sending_email);

        match self.service.reset_password(&self.member.id, &password, true).await {
            Ok(()) => {
                info!(member = %self.member.id, "password email sent");
                self.notify(NoticeKind::Success, NoticeMessage::PasswordEmailSent);
                self.close_password_prompt().await;
            }
            Err(e) => {
                warn!(member = %self.member.id, error = %e, "password email failed");
                self.notify(NoticeKind::Error, NoticeMessage::PasswordEmailFailed);
            }
        }
    }

    /// Close the password prompt, discarding the password
    pub async fn close_password_prompt(&self) {
        let mut prompt = self.prompt.write().await;
        if matches!(*prompt, ResetPrompt::ShowingPassword(_)) {
            *prompt = ResetPrompt::Idle;
        }
    }

    pub async fn state(&self) -> ResetState {
        self.prompt.read().await.state()
    }

    /// The password currently shown, if any
    pub async fn generated_password(&self) -> Option<GeneratedPassword> {
        match &*self.prompt.read().await {
            ResetPrompt::ShowingPassword(password) => Some(password.clone()),
            _ => None,
        }
    }

    /// Whether the "copied" indicator is on
    pub fn is_copied(&self) -> bool {
        self.copied.load(Ordering::SeqCst)
    }

    /// Whether a password email request is outstanding
    pub fn is_sending_email(&self) -> bool {
        self.sending_email.load(Ordering::SeqCst)
    }

    fn notify(&self, kind: NoticeKind, message: NoticeMessage) {
        self.notifier.notify(kind, message.as_key());
    }

    fn schedule_copied_reset(&self) {
        // The timer holds only a weak reference, so a torn-down manager is
        // never touched.
        let copied = Arc::downgrade(&self.copied);
        let action = DeferredAction::schedule(COPIED_RESET_DELAY, move || {
            if let Some(copied) = copied.upgrade() {
                copied.store(false, Ordering::SeqCst);
            }
        });

        // Replacing a pending clear restarts the window.
        *self.copied_reset.lock().unwrap_or_else(|p| p.into_inner()) = Some(action);
    }

    fn clear_copied(&self) {
        if let Some(mut pending) = self
            .copied_reset
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            pending.cancel();
        }
        self.copied.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::mock::{
        DeniedClipboard, MockMemberService, OperateCounter, RecordingNotifier, ServiceCall,
    };

    struct Harness {
        manager: MemberRoleManager,
        service: Arc<MockMemberService>,
        notifier: Arc<RecordingNotifier>,
        refreshes: OperateCounter,
    }

    fn harness(service: MockMemberService, operator: Role) -> Harness {
        let service = Arc::new(service);
        let notifier = Arc::new(RecordingNotifier::new());
        let refreshes = OperateCounter::new();
        let manager = MemberRoleManager::new(
            Member::new("member-1", Role::Editor),
            Some(operator),
            RolePolicy::new(false),
            service.clone(),
        )
        .with_notifier(notifier.clone())
        .on_operate(refreshes.callback());

        Harness {
            manager,
            service,
            notifier,
            refreshes,
        }
    }

    #[tokio::test]
    async fn test_update_role_success_refreshes_and_notifies() {
        let h = harness(MockMemberService::new(), Role::Owner);

        h.manager.update_role(Role::Admin).await;

        assert_eq!(
            h.service.calls(),
            vec![ServiceCall::UpdateRole {
                member: "member-1".into(),
                role: Role::Admin
            }]
        );
        assert_eq!(h.refreshes.count(), 1);
        assert_eq!(
            h.notifier.notices(),
            vec![(NoticeKind::Success, "common.actionMsg.modifiedSuccessfully".to_string())]
        );
    }

    #[tokio::test]
    async fn test_update_role_failure_is_silent() {
        let h = harness(MockMemberService::failing(), Role::Owner);

        h.manager.update_role(Role::Admin).await;

        assert_eq!(h.service.calls().len(), 1);
        assert_eq!(h.refreshes.count(), 0);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_is_silent() {
        let h = harness(MockMemberService::failing(), Role::Admin);

        h.manager.delete_or_cancel_invitation().await;

        assert_eq!(h.refreshes.count(), 0);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_gate() {
        let h = harness(MockMemberService::new(), Role::Owner);

        assert_eq!(h.manager.state().await, ResetState::Idle);
        assert!(h.manager.open_reset_prompt().await);
        assert!(!h.manager.open_reset_prompt().await);
        assert_eq!(h.manager.state().await, ResetState::ConfirmingReset);

        h.manager.cancel_reset().await;
        assert_eq!(h.manager.state().await, ResetState::Idle);
        assert!(h.service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reset_success_shows_sent_password() {
        let h = harness(MockMemberService::new(), Role::Owner);
        h.manager.open_reset_prompt().await;

        h.manager.open_reset_prompt().await;
        h.manager.reset_password().await;

        let shown = h.manager.generated_password().await.unwrap();
        match h.service.calls().as_slice() {
            [ServiceCall::ResetPassword {
                password,
                send_email,
                ..
            }] => {
                assert_eq!(password, shown.expose());
                assert!(!send_email);
            }
            other => panic!("unexpected calls: {:?}", other),
        }
        assert_eq!(h.manager.state().await, ResetState::ShowingPassword);
        assert!(!h.manager.is_copied());
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_reset_failure_notifies_once_and_returns_to_idle() {
        let h = harness(MockMemberService::failing(), Role::Owner);
        h.manager.open_reset_prompt().await;

        h.manager.open_reset_prompt().await;
        h.manager.reset_password().await;

        assert_eq!(
            h.notifier.notices(),
            vec![(NoticeKind::Error, "common.actionMsg.actionFailed".to_string())]
        );
        assert_eq!(h.manager.state().await, ResetState::Idle);
        assert!(h.manager.generated_password().await.is_none());
        assert_eq!(h.service.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_without_prompt_is_ignored() {
        let h = harness(MockMemberService::new(), Role::Owner);

        h.manager.reset_password().await;

        assert!(h.service.calls().is_empty());
        assert_eq!(h.manager.state().await, ResetState::Idle);
        assert!(h.manager.generated_password().await.is_none());
    }

    #[tokio::test]
    async fn test_double_confirm_sends_one_reset() {
        let h = harness(MockMemberService::new(), Role::Owner);
        h.manager.open_reset_prompt().await;

        tokio::join!(h.manager.reset_password(), h.manager.reset_password());

        assert_eq!(h.service.calls().len(), 1);
        assert_eq!(h.manager.state().await, ResetState::ShowingPassword);
    }

    #[tokio::test]
    async fn test_confirm_while_reset_outstanding_is_ignored() {
        let service = Arc::new(MockMemberService::gated());
        let manager = Arc::new(MemberRoleManager::new(
            Member::new("member-1", Role::Editor),
            Some(Role::Owner),
            RolePolicy::new(false),
            service.clone(),
        ));
        manager.open_reset_prompt().await;

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.reset_password().await }
        });
        while service.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        manager.reset_password().await;
        assert_eq!(manager.state().await, ResetState::ConfirmingReset);
        assert!(!manager.open_reset_prompt().await);

        service.release(1);
        first.await.unwrap();
        assert_eq!(service.calls().len(), 1);
        assert_eq!(service.max_in_flight(), 1);
        assert_eq!(manager.state().await, ResetState::ShowingPassword);
    }

    #[tokio::test]
    async fn test_confirm_while_showing_password_is_ignored() {
        let h = harness(MockMemberService::new(), Role::Owner);
        h.manager.open_reset_prompt().await;
        h.manager.reset_password().await;
        let shown = h.manager.generated_password().await.unwrap();

        h.manager.reset_password().await;

        assert_eq!(h.service.calls().len(), 1);
        assert_eq!(h.manager.generated_password().await, Some(shown));
    }

    #[tokio::test]
    async fn test_abandoned_reset_returns_to_idle() {
        let service = Arc::new(MockMemberService::gated());
        let manager = Arc::new(MemberRoleManager::new(
            Member::new("member-1", Role::Editor),
            Some(Role::Owner),
            RolePolicy::new(false),
            service.clone(),
        ));
        manager.open_reset_prompt().await;

        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.reset_password().await }
        });
        while service.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        assert_eq!(manager.state().await, ResetState::Idle);
        assert!(manager.open_reset_prompt().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_sets_indicator_for_two_seconds() {
        let h = harness(MockMemberService::new(), Role::Owner);
        let clipboard = Arc::new(MemoryClipboard::new());
        let manager = h.manager.with_clipboard(clipboard.clone());
        manager.open_reset_prompt().await;
        manager.reset_password().await;
        let shown = manager.generated_password().await.unwrap();

        manager.copy_generated_password().await;

        assert!(manager.is_copied());
        assert_eq!(clipboard.contents().as_deref(), Some(shown.expose()));
        assert_eq!(h.notifier.count(NoticeKind::Success), 1);

        tokio::time::sleep(COPIED_RESET_DELAY - Duration::from_millis(1)).await;
        assert!(manager.is_copied());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!manager.is_copied());
    }

    #[tokio::test]
    async fn test_copy_failure_notifies_error() {
        let h = harness(MockMemberService::new(), Role::Owner);
        let manager = h.manager.with_clipboard(Arc::new(DeniedClipboard));
        manager.open_reset_prompt().await;
        manager.reset_password().await;

        manager.copy_generated_password().await;

        assert!(!manager.is_copied());
        assert_eq!(
            h.notifier.notices(),
            vec![(NoticeKind::Error, "common.actionMsg.copyFailed".to_string())]
        );
    }

    #[tokio::test]
    async fn test_email_success_closes_prompt() {
        let h = harness(MockMemberService::new(), Role::Owner);
        h.manager.open_reset_prompt().await;
        h.manager.reset_password().await;
        let shown = h.manager.generated_password().await.unwrap();

        h.manager.send_password_by_email().await;

        let calls = h.service.calls();
        assert_eq!(
            calls.last(),
            Some(&ServiceCall::ResetPassword {
                member: "member-1".into(),
                password: shown.expose().to_string(),
                send_email: true,
            })
        );
        assert_eq!(h.manager.state().await, ResetState::Idle);
        assert!(!h.manager.is_sending_email());
        assert_eq!(
            h.notifier.notices(),
            vec![(NoticeKind::Success, "common.members.passwordEmailSent".to_string())]
        );
    }

    #[tokio::test]
    async fn test_email_failure_keeps_prompt_open() {
        let h = harness(MockMemberService::new(), Role::Owner);
        h.manager.open_reset_prompt().await;
        h.manager.reset_password().await;
        h.service.set_failing(true);

        h.manager.send_password_by_email().await;

        assert_eq!(h.manager.state().await, ResetState::ShowingPassword);
        assert!(!h.manager.is_sending_email());
        assert_eq!(
            h.notifier.notices(),
            vec![(NoticeKind::Error, "common.members.passwordEmailFailed".to_string())]
        );
    }

    #[tokio::test]
    async fn test_close_discards_password() {
        let h = harness(MockMemberService::new(), Role::Owner);
        h.manager.open_reset_prompt().await;
        h.manager.reset_password().await;

        h.manager.close_password_prompt().await;

        assert_eq!(h.manager.state().await, ResetState::Idle);
        assert!(h.manager.generated_password().await.is_none());

        // Nothing left to copy or send.
        h.manager.copy_generated_password().await;
        h.manager.send_password_by_email().await;
        assert_eq!(h.service.calls().len(), 1);
        assert!(h.notifier.notices().is_empty());
    }

    #[test]
    fn test_menu_reflects_operator() {
        let h = harness(MockMemberService::new(), Role::Admin);
        assert_eq!(h.manager.assignable_roles(), vec![Role::Editor, Role::Normal]);
        assert_eq!(h.manager.role_menu().current, Role::Editor);
    }
}
