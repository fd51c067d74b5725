// ==========================================
// Cadet Roster - Domain enums
// ==========================================
// Storage format: upper snake case strings (as_str / FromStr)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// PersonKind - which registry a person lives in
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonKind {
    Cadet,
    Staff,
}

impl PersonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Cadet => "CADET",
            PersonKind::Staff => "STAFF",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CADET" => Ok(PersonKind::Cadet),
            "STAFF" => Ok(PersonKind::Staff),
            other => Err(format!("unknown person kind: {}", other)),
        }
    }
}

// ==========================================
// AttendanceStatus
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
        AttendanceStatus::Excused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Excused => "EXCUSED",
        }
    }

    /// Parses a free-text status token, case-insensitively.
    ///
    /// Whole words only; single-letter codes (P/A/L/E) are accepted when
    /// `allow_codes` is set, which is only safe for a dedicated status column.
    pub fn from_token(token: &str, allow_codes: bool) -> Option<Self> {
        let t = token
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match t.as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" | "tardy" => Some(AttendanceStatus::Late),
            "excused" => Some(AttendanceStatus::Excused),
            "p" if allow_codes => Some(AttendanceStatus::Present),
            "a" if allow_codes => Some(AttendanceStatus::Absent),
            "l" if allow_codes => Some(AttendanceStatus::Late),
            "e" if allow_codes => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttendanceStatus::from_token(s, false)
            .ok_or_else(|| format!("unknown attendance status: {}", s))
    }
}

// ==========================================
// LedgerType - merit / demerit
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerType {
    Merit,
    Demerit,
}

impl LedgerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerType::Merit => "MERIT",
            LedgerType::Demerit => "DEMERIT",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let t = token
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match t.as_str() {
            "merit" | "merits" => Some(LedgerType::Merit),
            "demerit" | "demerits" => Some(LedgerType::Demerit),
            _ => None,
        }
    }
}

impl fmt::Display for LedgerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerType::from_token(s).ok_or_else(|| format!("unknown ledger type: {}", s))
    }
}

// ==========================================
// EnrollmentStatus - entity-level flag
// ==========================================
// Non-active flags override the displayed remark only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Dropped,
    Incomplete,
    Transferred,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "ACTIVE",
            EnrollmentStatus::Dropped => "DROPPED",
            EnrollmentStatus::Incomplete => "INCOMPLETE",
            EnrollmentStatus::Transferred => "TRANSFERRED",
        }
    }

    /// Remark shown instead of the computed one, if any.
    pub fn remark_override(&self) -> Option<&'static str> {
        match self {
            EnrollmentStatus::Active => None,
            EnrollmentStatus::Dropped => Some("Dropped"),
            EnrollmentStatus::Incomplete => Some("Incomplete"),
            EnrollmentStatus::Transferred => Some("Transferred"),
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(EnrollmentStatus::Active),
            "DROPPED" => Ok(EnrollmentStatus::Dropped),
            "INCOMPLETE" | "INC" => Ok(EnrollmentStatus::Incomplete),
            "TRANSFERRED" => Ok(EnrollmentStatus::Transferred),
            other => Err(format!("unknown enrollment status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_token_is_case_insensitive() {
        assert_eq!(
            AttendanceStatus::from_token("PRESENT", false),
            Some(AttendanceStatus::Present)
        );
        assert_eq!(
            AttendanceStatus::from_token("(Late)", false),
            Some(AttendanceStatus::Late)
        );
        assert_eq!(AttendanceStatus::from_token("presently", false), None);
    }

    #[test]
    fn test_status_codes_only_when_allowed() {
        assert_eq!(AttendanceStatus::from_token("A", false), None);
        assert_eq!(
            AttendanceStatus::from_token("A", true),
            Some(AttendanceStatus::Absent)
        );
    }

    #[test]
    fn test_enum_string_roundtrip_for_storage() {
        for status in AttendanceStatus::ALL {
            assert_eq!(status.as_str().parse::<AttendanceStatus>().unwrap(), status);
        }
        assert_eq!("DEMERIT".parse::<LedgerType>().unwrap(), LedgerType::Demerit);
        assert_eq!("staff".parse::<PersonKind>().unwrap(), PersonKind::Staff);
    }
}
