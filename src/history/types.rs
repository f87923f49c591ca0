use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::{Approach, BondType, SessionId, SessionStatus};

/// Summary of a finished ritual for list views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub bond_type: BondType,
    pub approach: Approach,
    pub label: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub intensity_before: u8,
    pub intensity_after: Option<u8>,
    pub has_vow: bool,
    pub vow_honored: Option<bool>,
}
