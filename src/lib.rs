//! Local notification scheduling with a pending-set snapshot kept in step
//! with the operating system's notification center.
//!
//! The system authority owns permission, scheduling and delivery. This crate
//! asks it for changes and mirrors what it reports:
//!
//! - [`PermissionTracker`] requests and reads authorization,
//! - [`PendingStore`] schedules, cancels and refreshes the pending snapshot,
//! - [`NotificationSession`] ties both to the app lifecycle for a UI.

mod config;
mod error;
mod notify;
mod os_impl;
mod pending;
mod permission;
mod session;
mod trigger;

pub use config::*;
pub use error::Error;
pub use notify::*;
pub use os_impl::*;
pub use pending::{PendingSnapshot, PendingStore};
pub use permission::PermissionTracker;
pub use session::{NotificationSession, ScenePhase};
pub use trigger::*;

pub mod memory;
pub mod prelude;
