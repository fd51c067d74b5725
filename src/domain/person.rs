// ==========================================
// Cadet Roster - Registry identity
// ==========================================
// Invariants: external_id unique per kind when present,
//             email unique per kind (case-insensitive) when present
// ==========================================

use crate::domain::types::{EnrollmentStatus, PersonKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// NameParts - structured personal name
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NameParts {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
}

impl NameParts {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.trim().to_string(),
            middle_name: None,
            last_name: last_name.trim().to_string(),
            suffix: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty()
    }

    /// "First Middle Last Suffix"
    pub fn display(&self) -> String {
        let mut parts: Vec<&str> = vec![self.first_name.as_str()];
        if let Some(m) = &self.middle_name {
            parts.push(m.as_str());
        }
        parts.push(self.last_name.as_str());
        if let Some(s) = &self.suffix {
            parts.push(s.as_str());
        }
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ==========================================
// Person - one cadet or staff record
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub kind: PersonKind,
    pub external_id: Option<String>, // student / AFPSN number
    pub email: Option<String>,
    pub name: NameParts,
    pub unit: Option<String>,
    pub enrollment: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn display_name(&self) -> String {
        self.name.display()
    }
}

// ==========================================
// NewPerson - creation input
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub kind: PersonKind,
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub name: NameParts,
    pub unit: Option<String>,
}

// ==========================================
// PersonPatch - non-destructive update
// ==========================================
// None means "leave as is"; a patch can never blank a field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonPatch {
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub unit: Option<String>,
    pub enrollment: Option<EnrollmentStatus>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self == &PersonPatch::default()
    }

    /// Applies the patch; returns whether anything changed.
    pub fn apply_to(&self, person: &mut Person) -> bool {
        fn set(target: &mut String, value: &Option<String>) -> bool {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() && v != target.as_str() => {
                    *target = v.to_string();
                    true
                }
                _ => false,
            }
        }
        fn set_opt(target: &mut Option<String>, value: &Option<String>) -> bool {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() && target.as_deref() != Some(v) => {
                    *target = Some(v.to_string());
                    true
                }
                _ => false,
            }
        }

        let mut changed = false;
        changed |= set_opt(&mut person.external_id, &self.external_id);
        changed |= set_opt(&mut person.email, &self.email);
        changed |= set(&mut person.name.first_name, &self.first_name);
        changed |= set_opt(&mut person.name.middle_name, &self.middle_name);
        changed |= set(&mut person.name.last_name, &self.last_name);
        changed |= set_opt(&mut person.name.suffix, &self.suffix);
        changed |= set_opt(&mut person.unit, &self.unit);
        if let Some(enrollment) = self.enrollment {
            if person.enrollment != enrollment {
                person.enrollment = enrollment;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Person {
        Person {
            id: "p1".to_string(),
            kind: PersonKind::Cadet,
            external_id: Some("2024-0001".to_string()),
            email: Some("juan@school.edu".to_string()),
            name: NameParts::new("Juan", "Dela Cruz"),
            unit: Some("Alpha".to_string()),
            enrollment: EnrollmentStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_never_blanks_fields() {
        let mut person = sample();
        let patch = PersonPatch {
            email: Some("   ".to_string()),
            unit: Some(String::new()),
            ..Default::default()
        };
        assert!(!patch.apply_to(&mut person));
        assert_eq!(person.email.as_deref(), Some("juan@school.edu"));
        assert_eq!(person.unit.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_patch_reports_changes() {
        let mut person = sample();
        let patch = PersonPatch {
            unit: Some("Bravo".to_string()),
            middle_name: Some("Santos".to_string()),
            ..Default::default()
        };
        assert!(patch.apply_to(&mut person));
        assert_eq!(person.unit.as_deref(), Some("Bravo"));
        assert_eq!(person.display_name(), "Juan Santos Dela Cruz");

        // same patch again is a no-op
        assert!(!patch.apply_to(&mut person));
    }
}
