//! Data models
//!
//! Database entities (User, Session, Publisher, Content) and the role
//! permission table, plus the input types accepted by the services.

mod content;
mod permission;
mod publisher;
mod session;
mod subscription;
mod user;

pub use content::{Content, ContentInput, ContentKind, MAX_TITLE_LEN};
pub use permission::{Permission, PermissionAction};
pub use publisher::{Publisher, PublisherWithMembers};
pub use session::Session;
pub use subscription::Subscriptions;
pub use user::{InvalidRole, User, UserRole};
