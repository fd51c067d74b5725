// ==========================================
// Cadet Roster - Import orchestrator
// ==========================================
// Flow: detect → resolve → parse (blocking, timed) → map → normalize
//       → match → apply per kind → audit
// Whole-file errors are raised before the first write.
// Row errors are collected into ImportResult and never raised.
// ==========================================

use crate::cache::RosterCache;
use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::normalize::{name_key, normalize_email};
use crate::domain::{
    Blob, Candidate, GeneratedId, ImportArtifact, ImportBatch, ImportKind, ImportRequest,
    ImportResult, NewPerson, Person, PersonKind, PersonPatch, RowError, RowErrorKind,
};
use crate::engine::{GradeError, GradeService, KeyedLocks, RosterRepositories};
use crate::importer::entity_matcher::{EntityMatcher, MatchResult, MatchTier};
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{ParsedInput, UniversalFileParser};
use crate::importer::format_detector::{FormatClass, FormatDetector};
use crate::importer::id_generator::IdGenerator;
use crate::importer::importer_trait::{BlobResolver, Importer};
use crate::importer::row_normalizer::RowNormalizer;
use crate::repository::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct ImportOrchestrator {
    repos: RosterRepositories,
    grades: GradeService,
    config: Arc<dyn ImportConfigReader>,
    parser: UniversalFileParser,
    resolver: Arc<dyn BlobResolver>,
    roster_cache: RosterCache,
    // one roster import per registry at a time
    roster_locks: KeyedLocks,
}

impl ImportOrchestrator {
    pub fn new(
        grades: GradeService,
        config: Arc<dyn ImportConfigReader>,
        parser: UniversalFileParser,
        resolver: Arc<dyn BlobResolver>,
        roster_cache: RosterCache,
    ) -> Self {
        Self {
            repos: grades.repositories().clone(),
            grades,
            config,
            parser,
            resolver,
            roster_cache,
            roster_locks: KeyedLocks::new(),
        }
    }

    // ==========================================
    // Input stages
    // ==========================================

    async fn fetch_blob(&self, artifact: &ImportArtifact) -> ImporterResult<Blob> {
        match artifact {
            ImportArtifact::Blob(blob) => Ok(blob.clone()),
            ImportArtifact::Url(url) => {
                let blob = self.resolver.resolve_share_link(url).await?;
                debug!(url = %url, bytes = blob.bytes.len(), "share link resolved");
                Ok(blob)
            }
        }
    }

    /// Parsing, document extraction and OCR run on the blocking pool.
    async fn parse_with_timeout(
        &self,
        format: FormatClass,
        blob: Blob,
        limit: Duration,
    ) -> ImporterResult<ParsedInput> {
        let parser = self.parser.clone();
        let task = tokio::task::spawn_blocking(move || parser.parse(format, &blob));
        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                warn!(seconds = limit.as_secs(), format = format.as_str(), "parse timed out");
                Err(ImportError::ProcessingTimeout {
                    seconds: limit.as_secs(),
                })
            }
        }
    }

    // ==========================================
    // Roster: match → update, no match → create
    // ==========================================

    async fn apply_roster(
        &self,
        kind: PersonKind,
        candidates: Vec<Candidate>,
        settings: &ImportSettings,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        let _guard = self.roster_locks.lock(kind.as_str()).await;
        let matcher = EntityMatcher::new(self.repos.registry.clone());

        // pass 1: capacity check, nothing written yet
        let mut planned = HashSet::new();
        for candidate in candidates.iter().filter(|c| has_full_name(c)) {
            if let MatchResult::NoMatch {
                ambiguous: false, ..
            } = matcher.match_candidate(candidate, kind).await?
            {
                planned.insert(creation_key(candidate));
            }
        }
        let current = self.repos.registry.count(kind).await?;
        if current + planned.len() > settings.max_roster_size {
            warn!(
                current,
                incoming = planned.len(),
                limit = settings.max_roster_size,
                "roster cap reached, batch rejected"
            );
            return Err(ImportError::CapacityExceeded {
                current,
                incoming: planned.len(),
                limit: settings.max_roster_size,
            });
        }

        // pass 2: apply in row order, re-matching so repeated rows converge
        let mut generator: Option<IdGenerator> = None;
        for candidate in candidates {
            match matcher.match_candidate(&candidate, kind).await? {
                MatchResult::ExactMatch { person, tier } => {
                    result.matched += 1;
                    if self.update_person(person, tier, &candidate, result).await? {
                        result.updated += 1;
                    }
                }
                MatchResult::NoMatch {
                    reason,
                    ambiguous: true,
                } => result.record_error(RowError::new(
                    candidate.row,
                    RowErrorKind::NoMatch,
                    reason,
                    &candidate.raw_text,
                )),
                MatchResult::NoMatch { .. } => {
                    self.create_person(kind, &candidate, settings, &mut generator, result)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Non-destructive update. Returns whether the entry changed.
    async fn update_person(
        &self,
        mut person: Person,
        tier: MatchTier,
        candidate: &Candidate,
        result: &mut ImportResult,
    ) -> ImporterResult<bool> {
        let patch = roster_patch(&person, tier, candidate);
        if patch.is_empty() || !patch.apply_to(&mut person) {
            return Ok(false);
        }
        match self.repos.registry.update(&person).await {
            Ok(()) => {
                debug!(row = candidate.row, person_id = %person.id, "registry entry updated");
                Ok(true)
            }
            Err(e) => {
                result.record_error(rejected(candidate, e)?);
                Ok(false)
            }
        }
    }

    async fn create_person(
        &self,
        kind: PersonKind,
        candidate: &Candidate,
        settings: &ImportSettings,
        generator: &mut Option<IdGenerator>,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        let Some(name) = candidate.name.clone().filter(|n| n.is_complete()) else {
            result.record_error(RowError::new(
                candidate.row,
                RowErrorKind::NoIdentifiableCandidate,
                "no registry match, and a new entry needs a first and last name",
                &candidate.raw_text,
            ));
            return Ok(());
        };

        let mut generated = None;
        let external_id = match candidate.external_id.clone() {
            Some(id) => Some(id),
            None if settings.require_external_id => {
                if generator.is_none() {
                    *generator = Some(
                        IdGenerator::new(
                            self.repos.registry.clone(),
                            kind,
                            &settings.generated_id_prefix,
                        )
                        .await?,
                    );
                }
                match generator.as_mut() {
                    Some(g) => {
                        let id = g.next_id(&name).await?;
                        generated = Some(id.clone());
                        Some(id)
                    }
                    None => None,
                }
            }
            None => None,
        };

        let new_person = NewPerson {
            kind,
            external_id,
            email: candidate.email.clone(),
            name,
            unit: candidate.unit.clone(),
        };
        match self.repos.registry.create(new_person).await {
            Ok(person) => {
                debug!(row = candidate.row, person_id = %person.id, "registry entry created");
                result.created += 1;
                if let Some(external_id) = generated {
                    result.generated_ids.push(GeneratedId {
                        row: candidate.row,
                        person_id: person.id,
                        external_id,
                    });
                }
            }
            Err(e) => result.record_error(rejected(candidate, e)?),
        }
        Ok(())
    }

    // ==========================================
    // Attendance: match → upsert, never create
    // ==========================================

    async fn apply_attendance(
        &self,
        kind: PersonKind,
        day_id: &str,
        candidates: Vec<Candidate>,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        let matcher = EntityMatcher::new(self.repos.registry.clone());
        for candidate in candidates {
            let person = match matcher.match_candidate(&candidate, kind).await? {
                MatchResult::ExactMatch { person, .. } => person,
                MatchResult::NoMatch { reason, .. } => {
                    result.record_error(unmatched(&candidate, reason));
                    continue;
                }
            };
            let Some(status) = candidate.status else {
                result.record_error(RowError::new(
                    candidate.row,
                    RowErrorKind::AmbiguousRow,
                    "no attendance status",
                    &candidate.raw_text,
                ));
                continue;
            };

            match self
                .grades
                .mark_attendance(&person.id, day_id, status, candidate.remarks.as_deref())
                .await
            {
                Ok(_) => result.matched += 1,
                Err(e) => result.record_error(grade_rejected(&candidate, e)?),
            }
        }
        Ok(())
    }

    // ==========================================
    // Ledger: match → append (idempotent), never create
    // ==========================================

    async fn apply_ledger(
        &self,
        digest: Uuid,
        candidates: Vec<Candidate>,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        let matcher = EntityMatcher::new(self.repos.registry.clone());
        for candidate in candidates {
            let person = match matcher.match_candidate(&candidate, PersonKind::Cadet).await? {
                MatchResult::ExactMatch { person, .. } => person,
                MatchResult::NoMatch { reason, .. } => {
                    result.record_error(unmatched(&candidate, reason));
                    continue;
                }
            };
            let Some(line) = candidate.ledger.as_ref() else {
                result.record_error(RowError::new(
                    candidate.row,
                    RowErrorKind::AmbiguousRow,
                    "no merit/demerit type and points",
                    &candidate.raw_text,
                ));
                continue;
            };

            let source_key = ledger_source_key(&digest, &candidate);
            match self
                .grades
                .append_imported_ledger(
                    &person.id,
                    line.entry_type,
                    line.points,
                    &line.reason,
                    &source_key,
                )
                .await
            {
                Ok(entry) => {
                    result.matched += 1;
                    if entry.is_none() {
                        debug!(row = candidate.row, "ledger row already imported");
                    }
                }
                Err(e) => result.record_error(grade_rejected(&candidate, e)?),
            }
        }
        Ok(())
    }

    async fn record_batch(&self, request: &ImportRequest, result: &ImportResult) {
        let batch = ImportBatch {
            batch_id: result.batch_id.clone(),
            kind: request.kind.as_str().to_string(),
            registry: request.registry,
            source: result.source.clone(),
            total_rows: result.total_rows,
            matched: result.matched,
            created: result.created,
            updated: result.updated,
            skipped: result.skipped,
            errors_json: serde_json::to_string(&result.errors).unwrap_or_else(|_| "[]".to_string()),
            elapsed_ms: result.elapsed_ms,
            imported_at: Utc::now(),
        };
        // the import itself already succeeded
        if let Err(e) = self.repos.import_batches.insert(&batch).await {
            warn!(batch_id = %batch.batch_id, error = %e, "failed to record import batch");
        }
    }
}

#[async_trait]
impl Importer for ImportOrchestrator {
    #[instrument(
        skip(self, artifact, request),
        fields(batch_id, kind = request.kind.as_str(), registry = %request.registry)
    )]
    async fn run_import(
        &self,
        artifact: ImportArtifact,
        request: ImportRequest,
    ) -> ImporterResult<ImportResult> {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        let source = artifact.label();
        info!(source = %source, "import started");

        let settings = self.config.load_import_settings().await?;
        let registry = match request.kind {
            ImportKind::Ledger => PersonKind::Cadet,
            _ => request.registry,
        };
        if let ImportKind::Attendance { day_id } = &request.kind {
            if self.repos.training_days.find_by_id(day_id).await?.is_none() {
                return Err(ImportError::TrainingDayNotFound(day_id.clone()));
            }
        }

        // ===== Detect / resolve / parse =====
        FormatDetector.detect(&artifact)?;
        let blob = self.fetch_blob(&artifact).await?;
        let format = FormatDetector.detect_blob(&blob)?;
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, &blob.bytes);
        debug!(format = format.as_str(), bytes = blob.bytes.len(), "format detected");

        let parsed = self
            .parse_with_timeout(format, blob, settings.processing_timeout)
            .await?;

        // ===== Map / normalize =====
        let records = FieldMapper.to_records(&parsed);
        let normalizer = RowNormalizer::new(&settings.id_pattern)?;
        let assume_present = request
            .assume_present
            .unwrap_or(settings.assume_present_default);

        let mut result = ImportResult::new(&batch_id, request.kind.clone(), &source);
        result.total_rows = records.len();
        let mut candidates = Vec::with_capacity(records.len());
        for record in &records {
            match normalizer.normalize(record, &request.kind, assume_present) {
                Ok(candidate) => candidates.push(candidate),
                Err(row_error) => result.record_error(row_error),
            }
        }
        debug!(
            rows = records.len(),
            candidates = candidates.len(),
            "rows normalized"
        );

        // ===== Match / apply =====
        match &request.kind {
            ImportKind::Roster => {
                self.apply_roster(registry, candidates, &settings, &mut result)
                    .await?
            }
            ImportKind::Attendance { day_id } => {
                self.apply_attendance(registry, day_id, candidates, &mut result)
                    .await?
            }
            ImportKind::Ledger => self.apply_ledger(digest, candidates, &mut result).await?,
        }

        result.errors.sort_by_key(|e| e.row);
        result.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.roster_cache.invalidate(&registry);
        self.record_batch(&request, &result).await;

        info!(
            total = result.total_rows,
            matched = result.matched,
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            elapsed_ms = result.elapsed_ms,
            "import finished"
        );
        Ok(result)
    }

    async fn batch_import(
        &self,
        jobs: Vec<(ImportArtifact, ImportRequest)>,
    ) -> Vec<ImporterResult<ImportResult>> {
        info!(jobs = jobs.len(), "batch import started");
        let futures = jobs
            .into_iter()
            .map(|(artifact, request)| self.run_import(artifact, request));
        join_all(futures).await
    }
}

// ==========================================
// Helpers
// ==========================================

/// Dedup key for planned creations within one batch.
fn creation_key(candidate: &Candidate) -> String {
    if let Some(id) = &candidate.external_id {
        return format!("id:{}", id);
    }
    if let Some(email) = &candidate.email {
        return format!("email:{}", normalize_email(email));
    }
    match &candidate.name {
        Some(name) => format!("name:{}", name_key(&name.first_name, &name.last_name)),
        None => format!("row:{}", candidate.row),
    }
}

/// Fields a roster row may fill in or correct on a matched entry.
///
/// The external ID is only filled when missing. Names are only rewritten
/// when the match came from a stronger identifier than the name itself.
fn roster_patch(person: &Person, tier: MatchTier, candidate: &Candidate) -> PersonPatch {
    let mut patch = PersonPatch {
        external_id: candidate
            .external_id
            .clone()
            .filter(|_| person.external_id.is_none()),
        email: candidate.email.clone(),
        unit: candidate.unit.clone(),
        ..PersonPatch::default()
    };
    if let Some(name) = &candidate.name {
        if tier != MatchTier::Name {
            patch.first_name = Some(name.first_name.clone());
            patch.last_name = Some(name.last_name.clone());
        }
        if tier != MatchTier::Name || person.name.middle_name.is_none() {
            patch.middle_name = name.middle_name.clone();
        }
        if tier != MatchTier::Name || person.name.suffix.is_none() {
            patch.suffix = name.suffix.clone();
        }
    }
    patch
}

fn has_full_name(candidate: &Candidate) -> bool {
    candidate.name.as_ref().is_some_and(|n| n.is_complete())
}

/// Deterministic per-row key: same file, same row → same key.
fn ledger_source_key(digest: &Uuid, candidate: &Candidate) -> String {
    let row_identity = format!("{}|{}", candidate.row, candidate.raw_text);
    Uuid::new_v5(digest, row_identity.as_bytes()).to_string()
}

fn unmatched(candidate: &Candidate, reason: String) -> RowError {
    RowError::new(candidate.row, RowErrorKind::NoMatch, reason, &candidate.raw_text)
}

/// Store refusals become row errors; infrastructure failures abort.
fn rejected(candidate: &Candidate, err: RepositoryError) -> ImporterResult<RowError> {
    match err {
        RepositoryError::UniqueConstraintViolation(msg)
        | RepositoryError::ForeignKeyViolation(msg)
        | RepositoryError::ValidationError(msg) => Ok(RowError::new(
            candidate.row,
            RowErrorKind::Rejected,
            msg,
            &candidate.raw_text,
        )),
        other => Err(other.into()),
    }
}

fn grade_rejected(candidate: &Candidate, err: GradeError) -> ImporterResult<RowError> {
    match err {
        GradeError::Repository(e) => rejected(candidate, e),
        GradeError::Config(e) => Err(e.into()),
        other => Ok(RowError::new(
            candidate.row,
            RowErrorKind::Rejected,
            other.to_string(),
            &candidate.raw_text,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NameParts;
    use chrono::Utc;

    fn person(ext: Option<&str>) -> Person {
        Person {
            id: "p1".to_string(),
            kind: PersonKind::Cadet,
            external_id: ext.map(str::to_string),
            email: None,
            name: NameParts::new("Juan", "Dela Cruz"),
            unit: None,
            enrollment: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn candidate(ext: Option<&str>, first: &str, last: &str) -> Candidate {
        Candidate {
            row: 3,
            raw_text: format!("{} {}", first, last),
            external_id: ext.map(str::to_string),
            name: Some(NameParts::new(first, last)),
            ..Candidate::default()
        }
    }

    #[test]
    fn test_patch_fills_missing_external_id_only() {
        let patch = roster_patch(&person(None), MatchTier::Name, &candidate(Some("2024-0001"), "Juan", "Dela Cruz"));
        assert_eq!(patch.external_id.as_deref(), Some("2024-0001"));

        let patch = roster_patch(
            &person(Some("2024-0001")),
            MatchTier::ExternalId,
            &candidate(Some("2024-0001"), "Juan", "Dela Cruz"),
        );
        assert_eq!(patch.external_id, None);
    }

    #[test]
    fn test_name_tier_does_not_rewrite_names() {
        let patch = roster_patch(&person(None), MatchTier::Name, &candidate(None, "JUAN", "DELA CRUZ"));
        assert_eq!(patch.first_name, None);
        assert_eq!(patch.last_name, None);

        let patch = roster_patch(&person(Some("2024-0001")), MatchTier::ExternalId, &candidate(Some("2024-0001"), "Juanito", "Dela Cruz"));
        assert_eq!(patch.first_name.as_deref(), Some("Juanito"));
    }

    #[test]
    fn test_source_key_is_deterministic_per_row() {
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"file bytes");
        let a = candidate(Some("2024-0001"), "Juan", "Dela Cruz");
        let mut b = a.clone();
        assert_eq!(ledger_source_key(&digest, &a), ledger_source_key(&digest, &b));
        b.row = 4;
        assert_ne!(ledger_source_key(&digest, &a), ledger_source_key(&digest, &b));
    }

    #[test]
    fn test_creation_key_prefers_strongest_identifier() {
        assert_eq!(creation_key(&candidate(Some("2024-0001"), "A", "B")), "id:2024-0001");
        assert_eq!(creation_key(&candidate(None, "Ana", "Reyes")), "name:reyes|ana");
    }

    #[test]
    fn test_store_refusal_is_a_row_error() {
        let c = candidate(None, "Ana", "Reyes");
        let row = rejected(&c, RepositoryError::UniqueConstraintViolation("email".to_string())).unwrap();
        assert_eq!(row.kind, RowErrorKind::Rejected);
        assert!(rejected(&c, RepositoryError::LockError("poisoned".to_string())).is_err());
    }
}
