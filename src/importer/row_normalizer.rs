// ==========================================
// Cadet Roster - Row normalizer
// ==========================================
// RawRecord → Candidate, or a per-row RowError
// Per field, first rule that matches wins:
//   1. external ID token (institution pattern)
//   2. email token
//   3. name (header columns, else first run of capitalized words)
//   4. intent: attendance status / ledger type + points
// ==========================================

use crate::domain::{
    AttendanceStatus, Candidate, ImportKind, LedgerLine, LedgerType, NameParts, RowError,
    RowErrorKind,
};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::field_mapper::{CanonicalField, RawRecord};
use regex::Regex;
use std::collections::HashMap;

const EMAIL_PATTERN: &str = r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.[a-z]{2,}\b";

pub struct RowNormalizer {
    id_pattern: Regex,
    email_pattern: Regex,
    cleaner: DataCleaner,
}

impl RowNormalizer {
    pub fn new(id_pattern: &str) -> ImporterResult<Self> {
        let id_pattern = Regex::new(id_pattern)
            .map_err(|e| ImportError::InternalError(format!("bad ID pattern: {}", e)))?;
        let email_pattern = Regex::new(EMAIL_PATTERN)
            .map_err(|e| ImportError::InternalError(format!("bad email pattern: {}", e)))?;
        Ok(Self {
            id_pattern,
            email_pattern,
            cleaner: DataCleaner,
        })
    }

    /// Normalizes one record for the given import kind.
    ///
    /// `assume_present` only affects attendance rows without a status token.
    pub fn normalize(
        &self,
        record: &RawRecord,
        kind: &ImportKind,
        assume_present: bool,
    ) -> Result<Candidate, RowError> {
        let mut candidate = match record {
            RawRecord::Fields { row, fields, raw_text } => {
                self.from_fields(*row, fields, raw_text)
            }
            RawRecord::Line { row, text } => self.from_line(*row, text),
        };

        if !candidate.has_identifier() {
            return Err(RowError::new(
                candidate.row,
                RowErrorKind::NoIdentifiableCandidate,
                "no ID, email or full name found",
                &candidate.raw_text,
            ));
        }

        match kind {
            // a nameless row may still update an entry matched by ID or email;
            // creation checks for a full name
            ImportKind::Roster => {}
            ImportKind::Attendance { .. } => {
                if candidate.status.is_none() {
                    if !assume_present {
                        return Err(RowError::new(
                            candidate.row,
                            RowErrorKind::AmbiguousRow,
                            "no attendance status",
                            &candidate.raw_text,
                        ));
                    }
                    candidate.status = Some(AttendanceStatus::Present);
                    candidate.status_defaulted = true;
                }
            }
            ImportKind::Ledger => {
                if candidate.ledger.is_none() {
                    return Err(RowError::new(
                        candidate.row,
                        RowErrorKind::AmbiguousRow,
                        "no merit/demerit type with positive points",
                        &candidate.raw_text,
                    ));
                }
            }
        }

        Ok(candidate)
    }

    // ==========================================
    // Tabular rows
    // ==========================================
    fn from_fields(
        &self,
        row: usize,
        fields: &HashMap<CanonicalField, String>,
        raw_text: &str,
    ) -> Candidate {
        let get = |field: CanonicalField| {
            self.cleaner
                .normalize_null(fields.get(&field).map(String::as_str))
        };

        // an ID column value that is not an ID is treated as absent
        let external_id = get(CanonicalField::ExternalId)
            .and_then(|v| self.id_pattern.find(&v).map(|m| m.as_str().to_string()));
        let email = get(CanonicalField::Email)
            .and_then(|v| self.email_pattern.find(&v).map(|m| m.as_str().to_string()));

        let name = match (get(CanonicalField::FirstName), get(CanonicalField::LastName)) {
            (Some(first), Some(last)) => Some(NameParts {
                first_name: self.cleaner.clean_text(&first),
                middle_name: get(CanonicalField::MiddleName),
                last_name: self.cleaner.clean_text(&last),
                suffix: get(CanonicalField::Suffix)
                    .map(|s| self.cleaner.normalize_suffix(&s).unwrap_or(s)),
            }),
            _ => get(CanonicalField::FullName)
                .and_then(|full| self.cleaner.split_full_name(&full))
                .map(|mut parts| {
                    if let Some(m) = get(CanonicalField::MiddleName) {
                        parts.middle_name = Some(m);
                    }
                    if let Some(s) = get(CanonicalField::Suffix) {
                        parts.suffix = Some(self.cleaner.normalize_suffix(&s).unwrap_or(s));
                    }
                    parts
                }),
        };

        let status = get(CanonicalField::Status)
            .and_then(|v| AttendanceStatus::from_token(&v, true));

        let reason = get(CanonicalField::Reason).or_else(|| get(CanonicalField::Remarks));
        let ledger = get(CanonicalField::LedgerType)
            .and_then(|t| LedgerType::from_token(&t))
            .zip(
                get(CanonicalField::Points).and_then(|p| self.cleaner.parse_points(&p)),
            )
            .map(|(entry_type, points)| LedgerLine {
                entry_type,
                points,
                reason: reason
                    .clone()
                    .unwrap_or_else(|| format!("Imported {}", entry_type.as_str().to_lowercase())),
            });

        Candidate {
            row,
            raw_text: raw_text.to_string(),
            external_id,
            email,
            name,
            unit: get(CanonicalField::Unit),
            status,
            status_defaulted: false,
            remarks: get(CanonicalField::Remarks),
            ledger,
        }
    }

    // ==========================================
    // Unstructured lines (documents, OCR, header-less sheets)
    // ==========================================
    fn from_line(&self, row: usize, text: &str) -> Candidate {
        let external_id = self
            .id_pattern
            .find(text)
            .map(|m| m.as_str().to_string());
        let email = self.email_pattern.find(text).map(|m| m.as_str().to_string());

        // remove ID and email so their fragments are not read as names or points
        let mut rest = text.to_string();
        for token in [external_id.as_deref(), email.as_deref()].into_iter().flatten() {
            rest = rest.replacen(token, " ", 1);
        }
        let tokens: Vec<&str> = rest.split_whitespace().collect();

        let status = tokens
            .iter()
            .find_map(|t| AttendanceStatus::from_token(t, false));
        let is_intent = |t: &str| {
            AttendanceStatus::from_token(t, false).is_some() || LedgerType::from_token(t).is_some()
        };

        // name_at[i] is the position in `tokens` of the i-th name token
        let name_at: Vec<usize> = (0..tokens.len()).filter(|&i| !is_intent(tokens[i])).collect();
        let name_tokens: Vec<&str> = name_at.iter().map(|&i| tokens[i]).collect();
        let (name, name_span) = match self.first_name_run(&name_tokens) {
            Some((start, end)) => (
                self.cleaner.split_full_name(&name_tokens[start..end].join(" ")),
                Some((name_at[start], name_at[end - 1] + 1)),
            ),
            None => (None, None),
        };

        let ledger = tokens
            .iter()
            .position(|t| LedgerType::from_token(t).is_some())
            .and_then(|type_at| {
                let entry_type = LedgerType::from_token(tokens[type_at])?;
                let points_at = self.points_position(&tokens, type_at, name_span)?;
                let points = self.cleaner.parse_points(tokens[points_at])?;
                let reason = tokens
                    .iter()
                    .enumerate()
                    .filter(|&(i, t)| {
                        i != points_at
                            && !name_span.is_some_and(|(s, e)| i >= s && i < e)
                            && !is_intent(*t)
                            && !self.cleaner.is_list_marker(t)
                    })
                    .map(|(_, t)| *t)
                    .collect::<Vec<&str>>()
                    .join(" ");
                let reason = reason
                    .trim_matches(|c: char| c == '-' || c == ':' || c.is_whitespace())
                    .to_string();
                Some(LedgerLine {
                    entry_type,
                    points,
                    reason: if reason.is_empty() {
                        format!("Imported {}", entry_type.as_str().to_lowercase())
                    } else {
                        reason
                    },
                })
            });

        Candidate {
            row,
            raw_text: text.to_string(),
            external_id,
            email,
            name,
            unit: None,
            status,
            status_defaulted: false,
            remarks: None,
            ledger,
        }
    }

    /// Points sit next to the merit/demerit word: the first number after it,
    /// else the closest one before it but after the name. List markers never count.
    fn points_position(
        &self,
        tokens: &[&str],
        type_at: usize,
        name_span: Option<(usize, usize)>,
    ) -> Option<usize> {
        let is_points = |i: usize| {
            !self.cleaner.is_list_marker(tokens[i]) && self.cleaner.parse_points(tokens[i]).is_some()
        };
        let floor = name_span.map_or(0, |(_, end)| end);
        (type_at + 1..tokens.len())
            .find(|&i| is_points(i))
            .or_else(|| (floor..type_at).rev().find(|&i| is_points(i)))
    }

    /// Span of the first run of two or more capitalized words.
    /// Lowercase surname particles may appear inside the run, and a
    /// trailing comma ("Dela Cruz, Juan") keeps the run going.
    fn first_name_run(&self, tokens: &[&str]) -> Option<(usize, usize)> {
        let mut i = 0;
        while i < tokens.len() {
            if !is_capitalized_word(tokens[i]) {
                i += 1;
                continue;
            }
            let start = i;
            let mut end = i + 1;
            let mut words = 1;
            while end < tokens.len() {
                if is_capitalized_word(tokens[end]) {
                    words += 1;
                    end += 1;
                } else if self.cleaner.is_particle(tokens[end]) {
                    // "de los Santos": skip particles if a capitalized word follows
                    let mut next = end;
                    while next < tokens.len() && self.cleaner.is_particle(tokens[next]) {
                        next += 1;
                    }
                    if next < tokens.len() && is_capitalized_word(tokens[next]) {
                        end = next;
                    } else {
                        break;
                    }
                } else {
                    break;
                }
            }
            if words >= 2 {
                return Some((start, end));
            }
            i = end;
        }
        None
    }
}

/// "Juan", "Dela", "Cruz,", "M.", "O'Neil", "Ana-Marie".
fn is_capitalized_word(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_uppercase()
        && token
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, '.' | '\'' | '-' | ','))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ID_PATTERN;

    fn normalizer() -> RowNormalizer {
        RowNormalizer::new(DEFAULT_ID_PATTERN).unwrap()
    }

    fn line(text: &str) -> RawRecord {
        RawRecord::Line {
            row: 1,
            text: text.to_string(),
        }
    }

    fn fields(pairs: &[(CanonicalField, &str)]) -> RawRecord {
        RawRecord::Fields {
            row: 2,
            fields: pairs.iter().map(|(f, v)| (*f, v.to_string())).collect(),
            raw_text: pairs.iter().map(|(_, v)| *v).collect::<Vec<_>>().join(" "),
        }
    }

    fn attendance() -> ImportKind {
        ImportKind::Attendance {
            day_id: "day".to_string(),
        }
    }

    #[test]
    fn test_line_with_id_name_status() {
        let c = normalizer()
            .normalize(&line("1. 2024-0001 Juan Dela Cruz PRESENT"), &attendance(), false)
            .unwrap();
        assert_eq!(c.external_id.as_deref(), Some("2024-0001"));
        let name = c.name.unwrap();
        assert_eq!(name.first_name, "Juan");
        assert_eq!(name.last_name, "Dela Cruz");
        assert_eq!(c.status, Some(AttendanceStatus::Present));
    }

    #[test]
    fn test_line_comma_name_and_email() {
        let c = normalizer()
            .normalize(
                &line("Reyes, Ana B. ana.reyes@school.edu late"),
                &attendance(),
                false,
            )
            .unwrap();
        assert_eq!(c.email.as_deref(), Some("ana.reyes@school.edu"));
        let name = c.name.unwrap();
        assert_eq!(name.last_name, "Reyes");
        assert_eq!(name.first_name, "Ana");
        assert_eq!(c.status, Some(AttendanceStatus::Late));
    }

    #[test]
    fn test_missing_status_policy() {
        let n = normalizer();
        let err = n
            .normalize(&line("Juan Dela Cruz"), &attendance(), false)
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::AmbiguousRow);

        let c = n.normalize(&line("Juan Dela Cruz"), &attendance(), true).unwrap();
        assert_eq!(c.status, Some(AttendanceStatus::Present));
        assert!(c.status_defaulted);
    }

    #[test]
    fn test_unidentifiable_line() {
        let err = normalizer()
            .normalize(&line("bad-row"), &attendance(), true)
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::NoIdentifiableCandidate);
        assert_eq!(err.raw_text, "bad-row");
    }

    #[test]
    fn test_bad_id_column_is_ignored() {
        let err = normalizer()
            .normalize(
                &fields(&[(CanonicalField::ExternalId, "bad-row")]),
                &attendance(),
                true,
            )
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::NoIdentifiableCandidate);
    }

    #[test]
    fn test_tabular_columns() {
        let c = normalizer()
            .normalize(
                &fields(&[
                    (CanonicalField::ExternalId, "2024-0007"),
                    (CanonicalField::LastName, "Dela Cruz"),
                    (CanonicalField::FirstName, "Juan"),
                    (CanonicalField::Suffix, "jr."),
                    (CanonicalField::Status, "E"),
                ]),
                &attendance(),
                false,
            )
            .unwrap();
        assert_eq!(c.external_id.as_deref(), Some("2024-0007"));
        assert_eq!(c.name.as_ref().and_then(|n| n.suffix.as_deref()), Some("Jr"));
        assert_eq!(c.status, Some(AttendanceStatus::Excused));
    }

    #[test]
    fn test_ledger_line() {
        let c = normalizer()
            .normalize(
                &line("2024-0001 Juan Dela Cruz demerit 3 improper uniform"),
                &ImportKind::Ledger,
                false,
            )
            .unwrap();
        let ledger = c.ledger.unwrap();
        assert_eq!(ledger.entry_type, LedgerType::Demerit);
        assert_eq!(ledger.points, 3);
        assert_eq!(ledger.reason, "improper uniform");
    }

    #[test]
    fn test_ledger_points_ignore_list_number() {
        let n = normalizer();
        let c = n
            .normalize(
                &line("1. 2024-0001 Juan Dela Cruz demerit 3 improper uniform"),
                &ImportKind::Ledger,
                false,
            )
            .unwrap();
        let ledger = c.ledger.unwrap();
        assert_eq!(ledger.points, 3);
        assert_eq!(ledger.reason, "improper uniform");

        // points written before the type word
        let c = n
            .normalize(
                &line("2) Ana Reyes 5 merit color guard"),
                &ImportKind::Ledger,
                false,
            )
            .unwrap();
        let ledger = c.ledger.unwrap();
        assert_eq!(ledger.entry_type, LedgerType::Merit);
        assert_eq!(ledger.points, 5);
        assert_eq!(ledger.reason, "color guard");
    }

    #[test]
    fn test_list_number_alone_is_not_points() {
        let err = normalizer()
            .normalize(&line("4. Juan Dela Cruz merit"), &ImportKind::Ledger, false)
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::AmbiguousRow);
    }

    #[test]
    fn test_ledger_without_points_is_ambiguous() {
        let err = normalizer()
            .normalize(&line("Juan Dela Cruz merit"), &ImportKind::Ledger, false)
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::AmbiguousRow);
    }

    #[test]
    fn test_roster_row_without_name_keeps_identifiers() {
        let c = normalizer()
            .normalize(
                &fields(&[
                    (CanonicalField::ExternalId, "2024-0001"),
                    (CanonicalField::Email, "juan@school.edu"),
                    (CanonicalField::Unit, "Alpha"),
                ]),
                &ImportKind::Roster,
                false,
            )
            .unwrap();
        assert!(c.name.is_none());
        assert_eq!(c.external_id.as_deref(), Some("2024-0001"));
        assert_eq!(c.unit.as_deref(), Some("Alpha"));
    }
}
