//! Database repositories
//!
//! One repository per aggregate, each a trait plus its SQLx implementation.

pub mod content;
pub mod permission;
pub mod publisher;
pub mod session;
pub mod subscription;
pub mod user;

pub use content::{ContentRepository, SqlxContentRepository};
pub use permission::{PermissionRepository, SqlxPermissionRepository};
pub use publisher::{MemberRole, PublisherRepository, SqlxPublisherRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use user::{SqlxUserRepository, UserRepository};
