// ==========================================
// Cadet Roster - Entity matcher
// ==========================================
// Tier order, first hit wins, no fallthrough once a tier hits:
//   1. external ID  (exact, case-sensitive)
//   2. email        (case-insensitive)
//   3. name         (last + first, normalized; middle/suffix ignored)
// No fuzzy matching: several name hits, or a hit whose stored external
// ID differs from the candidate's, are reported as NoMatch.
// ==========================================

use crate::domain::{Candidate, Person, PersonKind};
use crate::repository::{RegistryRepository, RepositoryResult};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    ExternalId,
    Email,
    Name,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::ExternalId => "external_id",
            MatchTier::Email => "email",
            MatchTier::Name => "name",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    ExactMatch {
        person: Person,
        tier: MatchTier,
    },
    NoMatch {
        reason: String,
        /// Set when registry entries were found but could not be used
        /// (ambiguous name, conflicting ID). Such rows must never create.
        ambiguous: bool,
    },
}

impl MatchResult {
    fn absent() -> Self {
        MatchResult::NoMatch {
            reason: "no registry entry matches ID, email or name".to_string(),
            ambiguous: false,
        }
    }

    fn ambiguous(reason: String) -> Self {
        MatchResult::NoMatch {
            reason,
            ambiguous: true,
        }
    }
}

pub struct EntityMatcher {
    registry: Arc<dyn RegistryRepository>,
}

impl EntityMatcher {
    pub fn new(registry: Arc<dyn RegistryRepository>) -> Self {
        Self { registry }
    }

    pub async fn match_candidate(
        &self,
        candidate: &Candidate,
        kind: PersonKind,
    ) -> RepositoryResult<MatchResult> {
        // ----- Tier 1: external ID -----
        if let Some(external_id) = candidate.external_id.as_deref() {
            if let Some(person) = self.registry.find_by_external_id(kind, external_id).await? {
                debug!(row = candidate.row, person_id = %person.id, "matched by external ID");
                return Ok(MatchResult::ExactMatch {
                    person,
                    tier: MatchTier::ExternalId,
                });
            }
        }

        // ----- Tier 2: email -----
        if let Some(email) = candidate.email.as_deref() {
            if let Some(person) = self.registry.find_by_email(kind, email).await? {
                return Ok(self.checked(candidate, person, MatchTier::Email));
            }
        }

        // ----- Tier 3: name -----
        let Some(name) = candidate.name.as_ref().filter(|n| n.is_complete()) else {
            return Ok(MatchResult::absent());
        };
        let mut hits = self
            .registry
            .find_by_name(kind, &name.first_name, &name.last_name)
            .await?;

        match hits.len() {
            0 => Ok(MatchResult::absent()),
            1 => {
                let person = hits.remove(0);
                Ok(self.checked(candidate, person, MatchTier::Name))
            }
            n => Ok(MatchResult::ambiguous(format!(
                "ambiguous name: {} registry entries named {}",
                n,
                name.display()
            ))),
        }
    }

    /// Rejects a lower-tier hit that already carries a different external ID.
    fn checked(&self, candidate: &Candidate, person: Person, tier: MatchTier) -> MatchResult {
        if let (Some(incoming), Some(stored)) =
            (candidate.external_id.as_deref(), person.external_id.as_deref())
        {
            if incoming != stored {
                return MatchResult::ambiguous(format!(
                    "{} matches {} but external ID {} differs from {}",
                    tier.as_str(),
                    person.display_name(),
                    incoming,
                    stored
                ));
            }
        }
        debug!(row = candidate.row, person_id = %person.id, tier = tier.as_str(), "candidate matched");
        MatchResult::ExactMatch { person, tier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{NameParts, NewPerson};
    use crate::repository::PersonRepositoryImpl;

    async fn registry() -> Arc<PersonRepositoryImpl> {
        Arc::new(PersonRepositoryImpl::new(open_in_memory().unwrap()))
    }

    async fn add(
        repo: &PersonRepositoryImpl,
        ext: Option<&str>,
        email: Option<&str>,
        first: &str,
        last: &str,
    ) -> Person {
        repo.create(NewPerson {
            kind: PersonKind::Cadet,
            external_id: ext.map(str::to_string),
            email: email.map(str::to_string),
            name: NameParts::new(first, last),
            unit: None,
        })
        .await
        .unwrap()
    }

    fn candidate(ext: Option<&str>, email: Option<&str>, first: &str, last: &str) -> Candidate {
        Candidate {
            row: 1,
            external_id: ext.map(str::to_string),
            email: email.map(str::to_string),
            name: Some(NameParts::new(first, last)),
            ..Candidate::default()
        }
    }

    #[tokio::test]
    async fn test_email_is_case_insensitive() {
        let repo = registry().await;
        let ana = add(&repo, None, Some("ana@school.edu"), "Ana", "Reyes").await;
        let matcher = EntityMatcher::new(repo);

        let result = matcher
            .match_candidate(&candidate(None, Some("ANA@School.EDU"), "X", "Y"), PersonKind::Cadet)
            .await
            .unwrap();
        assert_eq!(
            result,
            MatchResult::ExactMatch {
                person: ana,
                tier: MatchTier::Email
            }
        );
    }

    #[tokio::test]
    async fn test_name_ignores_case_and_diacritics() {
        let repo = registry().await;
        let jose = add(&repo, None, None, "José", "Dela Cruz").await;
        let matcher = EntityMatcher::new(repo);

        let result = matcher
            .match_candidate(&candidate(None, None, "JOSE", "delacruz"), PersonKind::Cadet)
            .await
            .unwrap();
        assert!(matches!(result, MatchResult::ExactMatch { person, tier: MatchTier::Name } if person.id == jose.id));
    }

    #[tokio::test]
    async fn test_duplicate_names_are_ambiguous() {
        let repo = registry().await;
        add(&repo, Some("2024-0001"), None, "Juan", "Dela Cruz").await;
        add(&repo, Some("2024-0002"), None, "Juan", "Dela Cruz").await;
        let matcher = EntityMatcher::new(repo);

        let result = matcher
            .match_candidate(&candidate(None, None, "Juan", "Dela Cruz"), PersonKind::Cadet)
            .await
            .unwrap();
        assert!(matches!(result, MatchResult::NoMatch { ambiguous: true, .. }));
    }

    #[tokio::test]
    async fn test_conflicting_external_id_is_not_merged() {
        let repo = registry().await;
        add(&repo, Some("2024-0001"), None, "Juan", "Dela Cruz").await;
        let matcher = EntityMatcher::new(repo);

        let result = matcher
            .match_candidate(
                &candidate(Some("2024-0999"), None, "Juan", "Dela Cruz"),
                PersonKind::Cadet,
            )
            .await
            .unwrap();
        assert!(matches!(result, MatchResult::NoMatch { ambiguous: true, .. }));
    }

    #[tokio::test]
    async fn test_unknown_candidate() {
        let matcher = EntityMatcher::new(registry().await);
        let result = matcher
            .match_candidate(&candidate(None, None, "Nobody", "Here"), PersonKind::Cadet)
            .await
            .unwrap();
        assert!(matches!(result, MatchResult::NoMatch { ambiguous: false, .. }));
    }
}
