//! Journal of finished rituals.
//!
//! Keeps every finalized [`SessionEntry`](crate::session::SessionEntry) so the
//! UI can list past sessions and, once a vow period is over, mark the vow as
//! honored or broken.

mod store;
mod types;

pub use store::SessionHistory;
pub use types::SessionSummary;
