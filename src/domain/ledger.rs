// ==========================================
// Cadet Roster - Merit / demerit ledger
// ==========================================

use crate::domain::types::LedgerType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub cadet_id: String,
    pub entry_type: LedgerType, // immutable after creation
    pub points: u32,            // always > 0
    pub reason: String,
    pub source_key: Option<String>, // set for imported entries
    pub created_at: DateTime<Utc>,
}

/// Aggregated ledger totals for one cadet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub merit_points: i64,
    pub demerit_points: i64,
}

impl LedgerTotals {
    pub fn net(&self) -> i64 {
        self.merit_points - self.demerit_points
    }
}
