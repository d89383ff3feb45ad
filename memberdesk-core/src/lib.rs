//! memberdesk core library
//!
//! Member role management for workspace dashboards: role transition policy,
//! password reset workflow, and the collaborators they talk to.

pub mod config;
pub mod logging;
pub mod mail;
pub mod members;
pub mod schedule;

pub use logging::{init_logging, LogLevel};
pub use members::{MemberRoleManager, Role, RolePolicy};
