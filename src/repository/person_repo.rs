// ==========================================
// Cadet Roster - Registry store (cadets / staff)
// ==========================================
// Rule: CRUD only, no business rules
// Lookups back the matcher tiers: external ID, email, name key
// ==========================================

use crate::db::SharedConnection;
use crate::domain::normalize::{name_key, normalize_email};
use crate::domain::{EnrollmentStatus, NameParts, NewPerson, Person, PersonKind};
use crate::repository::error::{parse_column, parse_timestamp, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

// ==========================================
// RegistryRepository Trait
// ==========================================
#[async_trait]
pub trait RegistryRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Person>>;

    /// Exact, case-sensitive match.
    async fn find_by_external_id(
        &self,
        kind: PersonKind,
        external_id: &str,
    ) -> RepositoryResult<Option<Person>>;

    /// Case-insensitive match.
    async fn find_by_email(&self, kind: PersonKind, email: &str)
        -> RepositoryResult<Option<Person>>;

    /// All persons whose normalized (last, first) equals the given name.
    async fn find_by_name(
        &self,
        kind: PersonKind,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<Vec<Person>>;

    async fn create(&self, person: NewPerson) -> RepositoryResult<Person>;

    /// Persists every mutable column of `person`.
    async fn update(&self, person: &Person) -> RepositoryResult<()>;

    /// Explicit admin delete; cascades attendance, ledger, scores.
    async fn delete(&self, id: &str) -> RepositoryResult<bool>;

    /// Registry size (bulkSize).
    async fn count(&self, kind: PersonKind) -> RepositoryResult<usize>;

    async fn list(&self, kind: PersonKind) -> RepositoryResult<Vec<Person>>;
}

// ==========================================
// PersonRepositoryImpl - rusqlite
// ==========================================
pub struct PersonRepositoryImpl {
    conn: SharedConnection,
}

const PERSON_COLUMNS: &str = "id, kind, external_id, email, first_name, middle_name, last_name, \
                              suffix, unit, enrollment, created_at, updated_at";

struct PersonRow {
    id: String,
    kind: String,
    external_id: Option<String>,
    email: Option<String>,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    suffix: Option<String>,
    unit: Option<String>,
    enrollment: String,
    created_at: String,
    updated_at: String,
}

impl PersonRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            external_id: row.get(2)?,
            email: row.get(3)?,
            first_name: row.get(4)?,
            middle_name: row.get(5)?,
            last_name: row.get(6)?,
            suffix: row.get(7)?,
            unit: row.get(8)?,
            enrollment: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_person(self) -> RepositoryResult<Person> {
        Ok(Person {
            kind: parse_column::<PersonKind>("kind", &self.kind)?,
            enrollment: parse_column::<EnrollmentStatus>("enrollment", &self.enrollment)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            external_id: self.external_id,
            email: self.email,
            name: NameParts {
                first_name: self.first_name,
                middle_name: self.middle_name,
                last_name: self.last_name,
                suffix: self.suffix,
            },
            unit: self.unit,
        })
    }
}

impl PersonRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn query_one(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Option<Person>> {
        let sql = format!("SELECT {} FROM person WHERE {} LIMIT 1", PERSON_COLUMNS, where_clause);
        let row = conn
            .query_row(&sql, params, PersonRow::from_row)
            .optional()?;
        row.map(PersonRow::into_person).transpose()
    }

    fn query_many(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<Person>> {
        let sql = format!(
            "SELECT {} FROM person WHERE {} ORDER BY last_name, first_name, id",
            PERSON_COLUMNS, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, PersonRow::from_row)?;
        let mut persons = Vec::new();
        for row in rows {
            persons.push(row?.into_person()?);
        }
        Ok(persons)
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl RegistryRepository for PersonRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Person>> {
        let conn = self.conn.lock()?;
        Self::query_one(&conn, "id = ?1", &[&id])
    }

    async fn find_by_external_id(
        &self,
        kind: PersonKind,
        external_id: &str,
    ) -> RepositoryResult<Option<Person>> {
        let conn = self.conn.lock()?;
        Self::query_one(
            &conn,
            "kind = ?1 AND external_id = ?2",
            &[&kind.as_str(), &external_id.trim()],
        )
    }

    async fn find_by_email(
        &self,
        kind: PersonKind,
        email: &str,
    ) -> RepositoryResult<Option<Person>> {
        let conn = self.conn.lock()?;
        Self::query_one(
            &conn,
            "kind = ?1 AND email_norm = ?2",
            &[&kind.as_str(), &normalize_email(email)],
        )
    }

    async fn find_by_name(
        &self,
        kind: PersonKind,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<Vec<Person>> {
        let key = name_key(first_name, last_name);
        let conn = self.conn.lock()?;
        Self::query_many(&conn, "kind = ?1 AND name_key = ?2", &[&kind.as_str(), &key])
    }

    async fn create(&self, person: NewPerson) -> RepositoryResult<Person> {
        if !person.name.is_complete() {
            return Err(RepositoryError::ValidationError(
                "first and last name are required".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Person {
            id: Uuid::new_v4().to_string(),
            kind: person.kind,
            external_id: clean(&person.external_id),
            email: clean(&person.email),
            name: NameParts {
                first_name: person.name.first_name.trim().to_string(),
                middle_name: clean(&person.name.middle_name),
                last_name: person.name.last_name.trim().to_string(),
                suffix: clean(&person.name.suffix),
            },
            unit: clean(&person.unit),
            enrollment: EnrollmentStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO person (
                id, kind, external_id, email, email_norm, first_name, middle_name,
                last_name, suffix, name_key, unit, enrollment, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                created.id,
                created.kind.as_str(),
                created.external_id,
                created.email,
                created.email.as_deref().map(normalize_email),
                created.name.first_name,
                created.name.middle_name,
                created.name.last_name,
                created.name.suffix,
                name_key(&created.name.first_name, &created.name.last_name),
                created.unit,
                created.enrollment.as_str(),
                created.created_at.to_rfc3339(),
                created.updated_at.to_rfc3339(),
            ],
        )?;

        // exam scores start at zero with the record
        conn.execute(
            "INSERT OR IGNORE INTO exam_scores (cadet_id, prelim, midterm, final_exam, updated_at)
             VALUES (?1, 0, 0, 0, ?2)",
            params![created.id, created.created_at.to_rfc3339()],
        )?;

        Ok(created)
    }

    async fn update(&self, person: &Person) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        let affected = conn.execute(
            r#"
            UPDATE person SET
                external_id = ?2, email = ?3, email_norm = ?4, first_name = ?5,
                middle_name = ?6, last_name = ?7, suffix = ?8, name_key = ?9,
                unit = ?10, enrollment = ?11, updated_at = ?12
            WHERE id = ?1
            "#,
            params![
                person.id,
                clean(&person.external_id),
                clean(&person.email),
                person.email.as_deref().map(normalize_email),
                person.name.first_name,
                person.name.middle_name,
                person.name.last_name,
                person.name.suffix,
                name_key(&person.name.first_name, &person.name.last_name),
                person.unit,
                person.enrollment.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Person".to_string(),
                id: person.id.clone(),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.conn.lock()?;
        let affected = conn.execute("DELETE FROM person WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    async fn count(&self, kind: PersonKind) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM person WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    async fn list(&self, kind: PersonKind) -> RepositoryResult<Vec<Person>> {
        let conn = self.conn.lock()?;
        Self::query_many(&conn, "kind = ?1", &[&kind.as_str()])
    }
}
