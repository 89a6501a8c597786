use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::{
    association::AssociationRecord,
    entity::{EntityKind, EntityRecord, EntityRef},
    source::ImportLog,
    Error, Result,
};

const ASSOCIATION_TABLE: &str = "scaimc_association";
const IMPORT_LOG_TABLE: &str = "scaimc_import_log";

// Only the term is unique per kind. Type and offsets describe the first
// mention seen and may repeat across terms.
const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scaimc_mirna (
    id TEXT PRIMARY KEY,
    entity_term TEXT NOT NULL UNIQUE,
    entity_type TEXT,
    entity_offsets TEXT
);

CREATE TABLE IF NOT EXISTS scaimc_disease_or_gene (
    id TEXT PRIMARY KEY,
    entity_term TEXT NOT NULL UNIQUE,
    entity_type TEXT,
    entity_offsets TEXT
);

CREATE TABLE IF NOT EXISTS scaimc_association (
    id TEXT PRIMARY KEY,
    pubmed TEXT NOT NULL,
    pair_id TEXT NOT NULL,
    sentence TEXT NOT NULL,
    interaction TEXT NOT NULL,
    interaction_type TEXT NOT NULL,
    e1_id TEXT NOT NULL REFERENCES scaimc_mirna(id),
    e2_id TEXT NOT NULL REFERENCES scaimc_disease_or_gene(id)
);

CREATE INDEX IF NOT EXISTS idx_association_e1 ON scaimc_association(e1_id);
CREATE INDEX IF NOT EXISTS idx_association_e2 ON scaimc_association(e2_id);
CREATE INDEX IF NOT EXISTS idx_association_pubmed ON scaimc_association(pubmed);

CREATE TABLE IF NOT EXISTS scaimc_import_log (
    id TEXT PRIMARY KEY,
    source_uri TEXT NOT NULL,
    imported_at TEXT NOT NULL,
    entity_count INTEGER NOT NULL,
    association_count INTEGER NOT NULL
);
"#;

const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS scaimc_import_log;
DROP TABLE IF EXISTS scaimc_association;
DROP TABLE IF EXISTS scaimc_disease_or_gene;
DROP TABLE IF EXISTS scaimc_mirna;
"#;

// Row order respects the association foreign keys.
const CLEAR_SQL: &str = r#"
DELETE FROM scaimc_association;
DELETE FROM scaimc_disease_or_gene;
DELETE FROM scaimc_mirna;
DELETE FROM scaimc_import_log;
"#;

type EntityRow = (String, String, Option<String>, Option<String>);
type AssociationRow = (String, String, String, String, String, String, String, String);

pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Create the tables if they do not already exist.
    pub async fn create_all(&self) -> Result<()> {
        sqlx::query(INIT_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn drop_all(&self) -> Result<()> {
        sqlx::query(DROP_SQL).execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    // Entity operations

    pub async fn find_entity(&self, kind: EntityKind, term: &str) -> Result<Option<EntityRecord>> {
        let row: Option<EntityRow> = sqlx::query_as(&format!(
            "SELECT id, entity_term, entity_type, entity_offsets FROM {} WHERE entity_term = ?",
            kind.table_name()
        ))
        .bind(term)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| parse_entity_row(kind, r)).transpose()
    }

    pub async fn get_entity(&self, kind: EntityKind, id: EntityRef) -> Result<EntityRecord> {
        let row: EntityRow = sqlx::query_as(&format!(
            "SELECT id, entity_term, entity_type, entity_offsets FROM {} WHERE id = ?",
            kind.table_name()
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::EntityNotFound {
            kind,
            id: id.as_uuid(),
        })?;

        parse_entity_row(kind, row)
    }

    pub async fn list_entities(&self, kind: EntityKind) -> Result<Vec<EntityRecord>> {
        let rows: Vec<EntityRow> = sqlx::query_as(&format!(
            "SELECT id, entity_term, entity_type, entity_offsets FROM {} ORDER BY entity_term",
            kind.table_name()
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| parse_entity_row(kind, r)).collect()
    }

    pub async fn count_entities(&self, kind: EntityKind) -> Result<u64> {
        self.count_table(kind.table_name()).await
    }

    // Association operations

    pub async fn list_associations(&self) -> Result<Vec<AssociationRecord>> {
        let rows: Vec<AssociationRow> = sqlx::query_as(
            r#"
            SELECT id, pubmed, pair_id, sentence, interaction, interaction_type, e1_id, e2_id
            FROM scaimc_association ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_association_row).collect()
    }

    pub async fn count_associations(&self) -> Result<u64> {
        self.count_table(ASSOCIATION_TABLE).await
    }

    // Import log

    pub async fn list_imports(&self) -> Result<Vec<ImportLog>> {
        let rows: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT id, source_uri, imported_at, entity_count, association_count
            FROM scaimc_import_log ORDER BY imported_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_import_row).collect()
    }

    /// Write a batch in one transaction: entities, then associations, then
    /// the import log entry. Nothing is visible unless every insert succeeds.
    pub async fn commit_batch(
        &self,
        entities: &[EntityRecord],
        associations: &[AssociationRecord],
        log: &ImportLog,
    ) -> Result<()> {
        self.write_batch(entities, associations, log, false).await
    }

    /// Like [`commit_batch`](Self::commit_batch), but every existing row is
    /// deleted in the same transaction first. On failure the previous
    /// contents stay in place.
    pub async fn replace_batch(
        &self,
        entities: &[EntityRecord],
        associations: &[AssociationRecord],
        log: &ImportLog,
    ) -> Result<()> {
        self.write_batch(entities, associations, log, true).await
    }

    async fn write_batch(
        &self,
        entities: &[EntityRecord],
        associations: &[AssociationRecord],
        log: &ImportLog,
        clear: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if clear {
            sqlx::query(CLEAR_SQL).execute(&mut *tx).await?;
        }

        for entity in entities {
            insert_entity(&mut tx, entity).await?;
        }

        for association in associations {
            insert_association(&mut tx, association).await?;
        }

        insert_import_log(&mut tx, log).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn count_table(&self, table: &'static str) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count).map_err(|_| Error::CorruptRow {
            table,
            reason: format!("negative count {count}"),
        })
    }
}

async fn insert_entity(conn: &mut SqliteConnection, entity: &EntityRecord) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {} (id, entity_term, entity_type, entity_offsets) VALUES (?, ?, ?, ?)",
        entity.kind.table_name()
    ))
    .bind(entity.id.to_string())
    .bind(&entity.term)
    .bind(&entity.entity_type)
    .bind(entity.offsets.map(|o| o.to_string()))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Error::DuplicateTerm {
                    kind: entity.kind,
                    term: entity.term.clone(),
                };
            }
        }
        Error::Database(e)
    })?;

    Ok(())
}

async fn insert_association(conn: &mut SqliteConnection, rec: &AssociationRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scaimc_association
            (id, pubmed, pair_id, sentence, interaction, interaction_type, e1_id, e2_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rec.id.to_string())
    .bind(&rec.pubmed_id)
    .bind(&rec.pair_id)
    .bind(&rec.sentence)
    .bind(&rec.interaction)
    .bind(&rec.interaction_type)
    .bind(rec.e1.to_string())
    .bind(rec.e2.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_import_log(conn: &mut SqliteConnection, log: &ImportLog) -> Result<()> {
    let count = |value: u64| {
        i64::try_from(value).map_err(|_| Error::CorruptRow {
            table: IMPORT_LOG_TABLE,
            reason: format!("count {value} out of range"),
        })
    };

    sqlx::query(
        r#"
        INSERT INTO scaimc_import_log (id, source_uri, imported_at, entity_count, association_count)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(log.id.to_string())
    .bind(&log.source_uri)
    .bind(log.imported_at.to_rfc3339())
    .bind(count(log.entity_count)?)
    .bind(count(log.association_count)?)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn parse_uuid(table: &'static str, value: &str) -> Result<Uuid> {
    value.parse().map_err(|_| Error::CorruptRow {
        table,
        reason: format!("invalid id {value:?}"),
    })
}

fn parse_entity_row(kind: EntityKind, row: EntityRow) -> Result<EntityRecord> {
    let (id, term, entity_type, offsets) = row;
    let table = kind.table_name();

    Ok(EntityRecord {
        id: EntityRef::from_uuid(parse_uuid(table, &id)?),
        kind,
        term,
        entity_type,
        offsets: offsets
            .map(|o| {
                o.parse().map_err(|_| Error::CorruptRow {
                    table,
                    reason: format!("invalid offsets {o:?}"),
                })
            })
            .transpose()?,
    })
}

fn parse_association_row(row: AssociationRow) -> Result<AssociationRecord> {
    let (id, pubmed_id, pair_id, sentence, interaction, interaction_type, e1_id, e2_id) = row;

    Ok(AssociationRecord {
        id: parse_uuid(ASSOCIATION_TABLE, &id)?,
        pubmed_id,
        pair_id,
        sentence,
        interaction,
        interaction_type,
        e1: EntityRef::from_uuid(parse_uuid(ASSOCIATION_TABLE, &e1_id)?),
        e2: EntityRef::from_uuid(parse_uuid(ASSOCIATION_TABLE, &e2_id)?),
    })
}

fn parse_import_row(row: (String, String, String, i64, i64)) -> Result<ImportLog> {
    let (id, source_uri, imported_at, entity_count, association_count) = row;
    let corrupt = |reason: String| Error::CorruptRow {
        table: IMPORT_LOG_TABLE,
        reason,
    };

    Ok(ImportLog {
        id: parse_uuid(IMPORT_LOG_TABLE, &id)?,
        source_uri,
        imported_at: DateTime::parse_from_rfc3339(&imported_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc),
        entity_count: u64::try_from(entity_count).map_err(|e| corrupt(e.to_string()))?,
        association_count: u64::try_from(association_count)
            .map_err(|e| corrupt(e.to_string()))?,
    })
}
