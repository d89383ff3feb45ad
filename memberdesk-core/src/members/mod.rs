//! Workspace member management
//!
//! ## Architecture
//!
//! - **Role / RolePolicy**: the closed role set and which roles an operator
//!   may hand out
//! - **MemberRoleManager**: role changes, removal and the password reset
//!   workflow for one member
//! - **MemberService**: the remote member API, with an HTTP client, an
//!   in-memory roster and a recording mock
//!
//! The manager never reads global state: the feature flag arrives through
//! the [`RolePolicy`] it is built with.

pub mod http;
pub mod manager;
pub mod memory;
pub mod mock;
pub mod password;
pub mod policy;
pub mod role;
pub mod service;
pub mod types;

pub use http::HttpMemberService;
pub use manager::{MemberRoleManager, ResetState, COPIED_RESET_DELAY};
pub use memory::{InMemoryMemberService, MembershipStatus, Workspace, WorkspaceError, WorkspaceMember};
pub use password::{generate_password, GeneratedPassword, PASSWORD_DIGITS, PASSWORD_LETTERS};
pub use policy::{compute_assignable_roles, RoleMenu, RoleMenuEntry, RolePolicy};
pub use role::{display_role, Role};
pub use service::{
    Clipboard, ClipboardError, MemberService, MemoryClipboard, NoticeKind, NoticeMessage, Notifier,
    OnOperate, ServiceError, TracingNotifier,
};
pub use types::{Member, MemberId};
