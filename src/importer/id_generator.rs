// ==========================================
// Cadet Roster - External ID generator
// ==========================================
// Format: {PREFIX}-{LASTNAME}{FIRST INITIAL}-{SEQ:04}
// e.g. AUTO-DELACRUZJ-0042
// The sequence starts after the current registry size and skips values
// already taken in the registry or earlier in the same batch.
// ==========================================

use crate::domain::normalize::normalize_name;
use crate::domain::{NameParts, PersonKind};
use crate::repository::{RegistryRepository, RepositoryResult};
use std::collections::HashSet;
use std::sync::Arc;

pub struct IdGenerator {
    registry: Arc<dyn RegistryRepository>,
    kind: PersonKind,
    prefix: String,
    next_seq: u32,
    issued: HashSet<String>,
}

impl IdGenerator {
    pub async fn new(
        registry: Arc<dyn RegistryRepository>,
        kind: PersonKind,
        prefix: &str,
    ) -> RepositoryResult<Self> {
        let count = registry.count(kind).await?;
        Ok(Self {
            registry,
            kind,
            prefix: prefix.trim().to_uppercase(),
            next_seq: u32::try_from(count).unwrap_or(u32::MAX - 1) + 1,
            issued: HashSet::new(),
        })
    }

    pub async fn next_id(&mut self, name: &NameParts) -> RepositoryResult<String> {
        let stem = id_stem(name);
        loop {
            let candidate = format!("{}-{}-{:04}", self.prefix, stem, self.next_seq);
            self.next_seq = self.next_seq.saturating_add(1);

            if self.issued.contains(&candidate) {
                continue;
            }
            if self
                .registry
                .find_by_external_id(self.kind, &candidate)
                .await?
                .is_some()
            {
                continue;
            }
            self.issued.insert(candidate.clone());
            return Ok(candidate);
        }
    }
}

fn id_stem(name: &NameParts) -> String {
    let last = normalize_name(&name.last_name).to_uppercase();
    let initial = normalize_name(&name.first_name)
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();
    let stem = format!("{}{}", last, initial);
    if stem.is_empty() {
        "X".to_string()
    } else {
        stem
    }
}
