//! In-memory member service
//!
//! A workspace roster with the same membership rules the remote service
//! enforces. Used by tests and by hosts that run without a backend.

use super::password::GeneratedPassword;
use super::role::Role;
use super::service::{MemberService, ServiceError};
use super::types::{Member, MemberId};
use crate::config::MailConfig;
use crate::mail::{send_force_password_reset_mail, Mailer, MemoryMailer};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Whether a roster entry is a member or an open invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Active,
    Pending,
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMember {
    pub id: MemberId,
    pub email: String,
    pub role: Role,
    pub status: MembershipStatus,
    pub invited_by: Option<MemberId>,
    /// Hex SHA-256 of the last password set through a reset
    pub password_digest: Option<String>,
}

/// Roster operation errors
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Member already exists in workspace")]
    MemberAlreadyExists,

    #[error("Member not found in workspace")]
    MemberNotFound,

    #[error("Cannot remove workspace owner")]
    CannotRemoveOwner,

    #[error("Cannot change owner's role")]
    CannotChangeOwnerRole,

    #[error("Ownership cannot be assigned through a role change")]
    CannotAssignOwner,

    #[error("Invitation has not been accepted yet")]
    InvitationPending,
}

/// Members of one workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    owner: MemberId,
    members: BTreeMap<MemberId, WorkspaceMember>,
}

impl Workspace {
    /// Create a workspace owned by `owner`
    pub fn new(owner: impl Into<MemberId>, owner_email: impl Into<String>) -> Self {
        let owner = owner.into();
        let mut members = BTreeMap::new();
        members.insert(
            owner.clone(),
            WorkspaceMember {
                id: owner.clone(),
                email: owner_email.into(),
                role: Role::Owner,
                status: MembershipStatus::Active,
                invited_by: None,
                password_digest: None,
            },
        );

        Self { owner, members }
    }

    pub fn owner(&self) -> &MemberId {
        &self.owner
    }

    /// Add an active member
    pub fn add_member(
        &mut self,
        id: impl Into<MemberId>,
        email: impl Into<String>,
        role: Role,
        invited_by: &MemberId,
    ) -> Result<(), WorkspaceError> {
        self.insert(id.into(), email.into(), role, MembershipStatus::Active, invited_by)
    }

    /// Add a pending invitation
    pub fn invite(
        &mut self,
        id: impl Into<MemberId>,
        email: impl Into<String>,
        role: Role,
        invited_by: &MemberId,
    ) -> Result<(), WorkspaceError> {
        self.insert(id.into(), email.into(), role, MembershipStatus::Pending, invited_by)
    }

    fn insert(
        &mut self,
        id: MemberId,
        email: String,
        role: Role,
        status: MembershipStatus,
        invited_by: &MemberId,
    ) -> Result<(), WorkspaceError> {
        if role == Role::Owner {
            return Err(WorkspaceError::CannotAssignOwner);
        }
        if self.members.contains_key(&id) {
            return Err(WorkspaceError::MemberAlreadyExists);
        }

        self.members.insert(
            id.clone(),
            WorkspaceMember {
                id,
                email,
                role,
                status,
                invited_by: Some(invited_by.clone()),
                password_digest: None,
            },
        );
        Ok(())
    }

    /// Remove a member or cancel an invitation; returns which it was
    pub fn remove(&mut self, id: &MemberId) -> Result<MembershipStatus, WorkspaceError> {
        if id == &self.owner {
            return Err(WorkspaceError::CannotRemoveOwner);
        }

        self.members
            .remove(id)
            .map(|m| m.status)
            .ok_or(WorkspaceError::MemberNotFound)
    }

    /// Change a member's role
    pub fn update_member_role(&mut self, id: &MemberId, role: Role) -> Result<(), WorkspaceError> {
        if id == &self.owner {
            return Err(WorkspaceError::CannotChangeOwnerRole);
        }
        if role == Role::Owner {
            return Err(WorkspaceError::CannotAssignOwner);
        }

        let member = self.members.get_mut(id).ok_or(WorkspaceError::MemberNotFound)?;
        member.role = role;
        Ok(())
    }

    /// Record a new password for an active member
    pub fn set_password(&mut self, id: &MemberId, password: &str) -> Result<(), WorkspaceError> {
        let member = self.members.get_mut(id).ok_or(WorkspaceError::MemberNotFound)?;
        if member.status == MembershipStatus::Pending {
            return Err(WorkspaceError::InvitationPending);
        }

        member.password_digest = Some(password_digest(password));
        Ok(())
    }

    pub fn get(&self, id: &MemberId) -> Option<&WorkspaceMember> {
        self.members.get(id)
    }

    pub fn get_member_role(&self, id: &MemberId) -> Option<Role> {
        self.members.get(id).map(|m| m.role)
    }

    /// Active members and open invitations, ordered by id
    pub fn list(&self) -> Vec<Member> {
        self.members
            .values()
            .map(|m| Member::new(m.id.clone(), m.role))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl WorkspaceError {
    fn into_service_error(self, id: &MemberId) -> ServiceError {
        match self {
            WorkspaceError::MemberNotFound => ServiceError::MemberNotFound(id.clone()),
            other => ServiceError::NotPermitted(other.to_string()),
        }
    }
}

/// [`MemberService`] over an in-memory [`Workspace`]
pub struct InMemoryMemberService {
    workspace: RwLock<Workspace>,
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
    language: String,
    failures: AtomicUsize,
}

impl InMemoryMemberService {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace: RwLock::new(workspace),
            mailer: Arc::new(MemoryMailer::new()),
            mail: MailConfig::default(),
            language: "en-US".to_string(),
            failures: AtomicUsize::new(0),
        }
    }

    /// Deliver password mails through `mailer`
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        self.mailer = mailer;
        self.mail = mail;
        self
    }

    /// Language used for password mails
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Make the next `n` requests fail with a transport error
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Snapshot of the roster
    pub async fn workspace(&self) -> Workspace {
        self.workspace.read().await.clone()
    }

    /// Whether `candidate` is the member's current password
    pub async fn verify_password(&self, id: &MemberId, candidate: &str) -> bool {
        let workspace = self.workspace.read().await;
        workspace
            .get(id)
            .and_then(|m| m.password_digest.as_deref())
            .is_some_and(|digest| digest == password_digest(candidate))
    }

    fn injected_failure(&self) -> Result<(), ServiceError> {
        let consumed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(ServiceError::Transport("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl MemberService for InMemoryMemberService {
    async fn update_role(&self, member_id: &MemberId, role: Role) -> Result<(), ServiceError> {
        self.injected_failure()?;

        let mut workspace = self.workspace.write().await;
        workspace
            .update_member_role(member_id, role)
            .map_err(|e| e.into_service_error(member_id))
    }

    async fn reset_password(
        &self,
        member_id: &MemberId,
        password: &GeneratedPassword,
        send_email: bool,
    ) -> Result<(), ServiceError> {
        self.injected_failure()?;

        let email = {
            let mut workspace = self.workspace.write().await;
            workspace
                .set_password(member_id, password.expose())
                .map_err(|e| e.into_service_error(member_id))?;
            workspace
                .get(member_id)
                .map(|m| m.email.clone())
                .ok_or_else(|| ServiceError::MemberNotFound(member_id.clone()))?
        };

        if send_email {
            debug!(member = %member_id, "queueing force password reset mail");
            send_force_password_reset_mail(
                self.mailer.as_ref(),
                &self.language,
                &email,
                password.expose(),
                &self.mail.console_web_url,
            )
            .await;
        }
        Ok(())
    }

    async fn delete_or_cancel_invitation(&self, member_id: &MemberId) -> Result<(), ServiceError> {
        self.injected_failure()?;

        let mut workspace = self.workspace.write().await;
        let status = workspace
            .remove(member_id)
            .map_err(|e| e.into_service_error(member_id))?;
        debug!(member = %member_id, ?status, "roster entry removed");
        Ok(())
    }
}
