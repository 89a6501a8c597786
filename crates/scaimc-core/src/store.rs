use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::association::AssociationRecord;
use crate::entity::{EntityKind, EntityRecord, EntityRef};
use crate::graph::{self, BelGraph};
use crate::ingest::{extract_source, EntityMention, IngestResult, IngestStats, RawPairRow};
use crate::source::{CorpusSource, ImportLog};
use crate::storage::Storage;
use crate::Result;

/// How `get_or_create` resolved a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Cached,
    Existing,
    Created,
}

/// Entity and association counts for the whole database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub mirnas: u64,
    pub diseases_or_genes: u64,
    pub associations: u64,
}

/// What one successful `commit` wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitSummary {
    pub entities: usize,
    pub associations: usize,
}

/// Get-or-create front end over [`Storage`].
///
/// Entities resolved during a run are memoized per kind, and everything
/// created is held back until [`commit`], which writes it in a single
/// transaction. The name map holds one entry per distinct term seen, so it is
/// bounded by the vocabulary of the loaded corpus; [`rollback`], [`reset`]
/// and [`repopulate`] empty it. One populate run at a time.
///
/// [`commit`]: UpsertStore::commit
/// [`rollback`]: UpsertStore::rollback
/// [`reset`]: UpsertStore::reset
/// [`repopulate`]: UpsertStore::repopulate
pub struct UpsertStore {
    storage: Storage,
    names: HashMap<EntityKind, HashMap<String, EntityRef>>,
    pending_entities: Vec<EntityRecord>,
    pending_associations: Vec<AssociationRecord>,
}

impl UpsertStore {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            names: HashMap::new(),
            pending_entities: Vec::new(),
            pending_associations: Vec::new(),
        }
    }

    pub async fn open(path: &str) -> Result<Self> {
        Ok(Self::new(Storage::open(path).await?))
    }

    pub async fn open_memory() -> Result<Self> {
        Ok(Self::new(Storage::open_memory().await?))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub async fn get_or_create_entity(&mut self, kind: EntityKind, term: &str) -> Result<EntityRef> {
        let (id, _) = self.resolve(kind, term, None, true).await?;
        Ok(id)
    }

    /// Like [`get_or_create_entity`](Self::get_or_create_entity), recording
    /// the mention's type and offsets if the entity is new.
    pub async fn get_or_create_mention(
        &mut self,
        kind: EntityKind,
        mention: &EntityMention,
    ) -> Result<(EntityRef, Resolution)> {
        self.resolve(kind, &mention.text, Some(mention), true).await
    }

    async fn resolve(
        &mut self,
        kind: EntityKind,
        term: &str,
        mention: Option<&EntityMention>,
        lookup: bool,
    ) -> Result<(EntityRef, Resolution)> {
        if let Some(id) = self.names.get(&kind).and_then(|m| m.get(term)) {
            return Ok((*id, Resolution::Cached));
        }

        // Skipped when the stored rows are about to be replaced.
        let existing = if lookup {
            self.storage.find_entity(kind, term).await?
        } else {
            None
        };

        if let Some(existing) = existing {
            debug!("found existing {} {:?}", kind, term);
            self.remember(kind, term, existing.id);
            return Ok((existing.id, Resolution::Existing));
        }

        let mut record = EntityRecord::new(kind, term.to_string());
        if let Some(m) = mention {
            record = record
                .with_type(m.entity_type.clone())
                .with_offsets(m.offsets);
        }

        let id = record.id;
        self.remember(kind, term, id);
        self.pending_entities.push(record);

        Ok((id, Resolution::Created))
    }

    fn remember(&mut self, kind: EntityKind, term: &str, id: EntityRef) {
        self.names
            .entry(kind)
            .or_default()
            .insert(term.to_string(), id);
    }

    pub fn record_association(&mut self, row: &RawPairRow, e1: EntityRef, e2: EntityRef) {
        let association = AssociationRecord::new(row.pubmed_id.clone(), row.pair_id.clone(), e1, e2)
            .with_sentence(row.sentence.clone())
            .with_interaction(row.interaction.clone(), row.interaction_type.clone());

        self.pending_associations.push(association);
    }

    pub fn pending_counts(&self) -> CommitSummary {
        CommitSummary {
            entities: self.pending_entities.len(),
            associations: self.pending_associations.len(),
        }
    }

    /// Write every pending entity and association in one transaction.
    ///
    /// On failure nothing from the batch is persisted and the store is reset
    /// by [`rollback`](Self::rollback).
    pub async fn commit(&mut self, source_uri: &str) -> Result<CommitSummary> {
        self.write(source_uri, false).await
    }

    async fn write(&mut self, source_uri: &str, replace: bool) -> Result<CommitSummary> {
        let summary = self.pending_counts();
        let log = ImportLog::new(source_uri.to_string())
            .with_counts(summary.entities as u64, summary.associations as u64);

        info!(
            "inserting {} entities and {} associations",
            summary.entities, summary.associations
        );

        let written = if replace {
            self.storage
                .replace_batch(&self.pending_entities, &self.pending_associations, &log)
                .await
        } else {
            self.storage
                .commit_batch(&self.pending_entities, &self.pending_associations, &log)
                .await
        };

        if let Err(e) = written {
            self.rollback();
            return Err(e);
        }

        self.pending_entities.clear();
        self.pending_associations.clear();

        Ok(summary)
    }

    /// Discard pending records. The name caches are cleared too since they
    /// may point at entities that were never written.
    pub fn rollback(&mut self) {
        if !self.pending_entities.is_empty() || !self.pending_associations.is_empty() {
            warn!(
                "discarding {} pending entities and {} pending associations",
                self.pending_entities.len(),
                self.pending_associations.len()
            );
        }

        self.pending_entities.clear();
        self.pending_associations.clear();
        self.names.clear();
    }

    /// Extract every pair from `source` and store it, committing once.
    ///
    /// Extraction finishes before anything is staged, so a malformed corpus
    /// leaves the database untouched, as does a failed commit.
    pub async fn populate(&mut self, source: &CorpusSource) -> IngestResult<IngestStats> {
        self.load(source, false).await
    }

    /// Replace the stored corpus with the contents of `source`.
    ///
    /// Existing rows are deleted in the same transaction that writes the new
    /// ones, so a failed extraction or commit keeps the previous data.
    pub async fn repopulate(&mut self, source: &CorpusSource) -> IngestResult<IngestStats> {
        self.load(source, true).await
    }

    async fn load(&mut self, source: &CorpusSource, replace: bool) -> IngestResult<IngestStats> {
        let start = Instant::now();

        info!("extracting pairs from {}", source);
        let rows = extract_source(source).await?;

        if replace {
            self.rollback();
        }

        info!("building models for {} pairs", rows.len());
        let mut stats = IngestStats {
            rows: rows.len(),
            ..IngestStats::default()
        };

        if let Err(e) = self.stage_rows(&rows, &mut stats, !replace).await {
            self.rollback();
            return Err(e.into());
        }

        let committed = self.write(&source.uri(), replace).await?;
        stats.new_entities = committed.entities;
        stats.new_associations = committed.associations;
        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "populated {} associations ({} new entities, {} matched) in {}ms",
            stats.new_associations, stats.new_entities, stats.matched_entities, stats.duration_ms
        );

        Ok(stats)
    }

    async fn stage_rows(
        &mut self,
        rows: &[RawPairRow],
        stats: &mut IngestStats,
        lookup: bool,
    ) -> Result<()> {
        for row in rows {
            let (e1, r1) = self
                .resolve(EntityKind::Mirna, &row.e1.text, Some(&row.e1), lookup)
                .await?;
            let (e2, r2) = self
                .resolve(EntityKind::DiseaseOrGene, &row.e2.text, Some(&row.e2), lookup)
                .await?;

            stats.matched_entities += [r1, r2]
                .iter()
                .filter(|r| **r == Resolution::Existing)
                .count();

            self.record_association(row, e1, e2);
        }

        Ok(())
    }

    pub async fn count(&self, kind: EntityKind) -> Result<u64> {
        self.storage.count_entities(kind).await
    }

    pub async fn count_associations(&self) -> Result<u64> {
        self.storage.count_associations().await
    }

    pub async fn is_populated(&self) -> Result<bool> {
        Ok(self.count(EntityKind::Mirna).await? > 0)
    }

    pub async fn summary(&self) -> Result<Summary> {
        Ok(Summary {
            mirnas: self.count(EntityKind::Mirna).await?,
            diseases_or_genes: self.count(EntityKind::DiseaseOrGene).await?,
            associations: self.count_associations().await?,
        })
    }

    pub async fn list_associations(&self) -> Result<Vec<AssociationRecord>> {
        self.storage.list_associations().await
    }

    pub async fn list_entities(&self, kind: EntityKind) -> Result<Vec<EntityRecord>> {
        self.storage.list_entities(kind).await
    }

    /// Drop and recreate the schema, forgetting any memoized entities.
    pub async fn reset(&mut self) -> Result<()> {
        self.rollback();
        self.storage.drop_all().await?;
        self.storage.create_all().await
    }

    pub async fn drop_all(&mut self) -> Result<()> {
        self.rollback();
        self.storage.drop_all().await
    }

    /// Build the BEL graph of every stored association.
    pub async fn to_bel_graph(&self) -> Result<BelGraph> {
        let associations = self.list_associations().await?;

        let mut entities = HashMap::new();
        for kind in EntityKind::ALL {
            for entity in self.list_entities(kind).await? {
                entities.insert(entity.id, entity);
            }
        }

        graph::to_graph(&associations, &entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CharOffsets;
    use crate::ingest::{IngestError, ParseError};

    const EXAMPLE: &str = r#"<corpus>
  <document origId="12345">
    <sentence id="s0" text="X inhibits Y.">
      <entity id="A" charOffset="0-1" text="X" type="miRNA"/>
      <entity id="B" charOffset="11-12" text="Y" type="Disease"/>
      <pair id="s0.p0" e1="A" e2="B" interaction="true" type="inhibition"/>
    </sentence>
  </document>
</corpus>"#;

    const SHARED_TERMS: &str = r#"<corpus>
  <document origId="1">
    <sentence text="miR-21 and miR-155 in glioma.">
      <entity id="e1" charOffset="0-6" text="miR-21" type="Specific_miRNAs"/>
      <entity id="e2" charOffset="11-18" text="miR-155" type="Specific_miRNAs"/>
      <entity id="e3" charOffset="22-28" text="glioma" type="Diseases"/>
      <pair id="p0" e1="e1" e2="e3" interaction="True" type="regulation"/>
      <pair id="p1" e1="e2" e2="e3" interaction="True" type="regulation"/>
    </sentence>
  </document>
  <document origId="2">
    <sentence text="glioma and miR-21.">
      <entity id="e1" charOffset="11-17" text="miR-21" type="Specific_miRNAs"/>
      <entity id="e2" charOffset="0-6" text="glioma" type="Diseases"/>
      <pair id="p2" e1="e1" e2="e2" interaction="False"/>
    </sentence>
  </document>
</corpus>"#;

    fn mention(text: &str) -> EntityMention {
        EntityMention {
            text: text.to_string(),
            entity_type: "Specific_miRNAs".to_string(),
            offsets: CharOffsets::new(0, 6),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let mut store = UpsertStore::open_memory().await.unwrap();

        let first = store.get_or_create_entity(EntityKind::Mirna, "miR-21").await.unwrap();
        let second = store.get_or_create_entity(EntityKind::Mirna, "miR-21").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.pending_counts().entities, 1);

        store.commit("inline").await.unwrap();
        assert_eq!(store.count(EntityKind::Mirna).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_term_in_both_kinds_is_distinct() {
        let mut store = UpsertStore::open_memory().await.unwrap();

        let as_mirna = store.get_or_create_entity(EntityKind::Mirna, "let-7").await.unwrap();
        let as_disease = store
            .get_or_create_entity(EntityKind::DiseaseOrGene, "let-7")
            .await
            .unwrap();

        assert_ne!(as_mirna, as_disease);
    }

    #[tokio::test]
    async fn test_resolution_paths() {
        let mut store = UpsertStore::open_memory().await.unwrap();

        let (id, how) = store
            .get_or_create_mention(EntityKind::Mirna, &mention("miR-21"))
            .await
            .unwrap();
        assert_eq!(how, Resolution::Created);

        let (_, how) = store
            .get_or_create_mention(EntityKind::Mirna, &mention("miR-21"))
            .await
            .unwrap();
        assert_eq!(how, Resolution::Cached);

        store.commit("inline").await.unwrap();

        // With the cache gone the term resolves through the table.
        store.names.clear();
        let (found, how) = store
            .get_or_create_mention(EntityKind::Mirna, &mention("miR-21"))
            .await
            .unwrap();
        assert_eq!(how, Resolution::Existing);
        assert_eq!(found, id);
        assert_eq!(store.pending_counts().entities, 0);

        let stored = store.storage().get_entity(EntityKind::Mirna, id).await.unwrap();
        assert_eq!(stored.entity_type.as_deref(), Some("Specific_miRNAs"));
        assert_eq!(stored.offsets, Some(CharOffsets::new(0, 6)));
    }

    #[tokio::test]
    async fn test_populate_end_to_end() {
        let mut store = UpsertStore::open_memory().await.unwrap();

        let stats = store
            .populate(&CorpusSource::Xml(EXAMPLE.to_string()))
            .await
            .unwrap();

        assert_eq!(stats.rows, 1);
        assert_eq!(stats.new_entities, 2);
        assert_eq!(stats.new_associations, 1);
        assert_eq!(store.count(EntityKind::Mirna).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::DiseaseOrGene).await.unwrap(), 1);
        assert_eq!(store.count_associations().await.unwrap(), 1);
        assert!(store.is_populated().await.unwrap());

        let associations = store.list_associations().await.unwrap();
        assert_eq!(associations[0].pubmed_id, "12345");
        assert_eq!(associations[0].sentence, "X inhibits Y.");
        assert_eq!(associations[0].interaction, "true");

        let graph = store.to_bel_graph().await.unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges().next().unwrap().label, "inhibition");
    }

    #[tokio::test]
    async fn test_populate_reuses_terms_across_rows() {
        let mut store = UpsertStore::open_memory().await.unwrap();

        store
            .populate(&CorpusSource::Xml(SHARED_TERMS.to_string()))
            .await
            .unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(
            summary,
            Summary {
                mirnas: 2,
                diseases_or_genes: 1,
                associations: 3,
            }
        );

        let associations = store.list_associations().await.unwrap();
        assert_eq!(associations[0].e2, associations[1].e2);
        assert_eq!(associations[0].e1, associations[2].e1);
    }

    #[tokio::test]
    async fn test_second_populate_matches_existing_entities() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        let source = CorpusSource::Xml(EXAMPLE.to_string());

        store.populate(&source).await.unwrap();
        store.names.clear();
        let stats = store.populate(&source).await.unwrap();

        assert_eq!(stats.new_entities, 0);
        assert_eq!(stats.matched_entities, 2);
        assert_eq!(store.count(EntityKind::Mirna).await.unwrap(), 1);
        assert_eq!(store.count_associations().await.unwrap(), 2);
        assert_eq!(store.storage().list_imports().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_entity_commits_nothing() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        let broken = EXAMPLE.replace(r#"e2="B""#, r#"e2="C""#);

        let result = store.populate(&CorpusSource::Xml(broken)).await;

        assert!(matches!(
            result,
            Err(IngestError::Parse(ParseError::UnknownEntity { .. }))
        ));
        assert_eq!(store.summary().await.unwrap(), Summary::default());
        assert_eq!(store.pending_counts(), CommitSummary::default());
    }

    #[tokio::test]
    async fn test_failed_commit_is_all_or_nothing() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        sqlx::query("DROP TABLE scaimc_association")
            .execute(store.storage().pool())
            .await
            .unwrap();

        let result = store.populate(&CorpusSource::Xml(EXAMPLE.to_string())).await;

        assert!(matches!(result, Err(IngestError::Store(_))));
        assert_eq!(store.count(EntityKind::Mirna).await.unwrap(), 0);
        assert_eq!(store.count(EntityKind::DiseaseOrGene).await.unwrap(), 0);
        assert_eq!(store.pending_counts(), CommitSummary::default());
        assert!(store.names.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        store
            .populate(&CorpusSource::Xml(EXAMPLE.to_string()))
            .await
            .unwrap();

        store.reset().await.unwrap();

        assert!(!store.is_populated().await.unwrap());
        assert_eq!(store.summary().await.unwrap(), Summary::default());
    }

    #[tokio::test]
    async fn test_repopulate_replaces_contents() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        store
            .populate(&CorpusSource::Xml(SHARED_TERMS.to_string()))
            .await
            .unwrap();

        let stats = store
            .repopulate(&CorpusSource::Xml(EXAMPLE.to_string()))
            .await
            .unwrap();

        assert_eq!(stats.new_entities, 2);
        assert_eq!(stats.matched_entities, 0);
        assert_eq!(
            store.summary().await.unwrap(),
            Summary {
                mirnas: 1,
                diseases_or_genes: 1,
                associations: 1,
            }
        );
        assert_eq!(store.storage().list_imports().await.unwrap().len(), 1);
        assert_eq!(store.to_bel_graph().await.unwrap().edge_count(), 1);
    }

    #[tokio::test]
    async fn test_repopulate_reuses_terms_already_stored() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        let source = CorpusSource::Xml(EXAMPLE.to_string());
        store.populate(&source).await.unwrap();

        store.repopulate(&source).await.unwrap();

        assert_eq!(store.count(EntityKind::Mirna).await.unwrap(), 1);
        assert_eq!(store.count_associations().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_repopulate_keeps_previous_data() {
        let mut store = UpsertStore::open_memory().await.unwrap();
        store
            .populate(&CorpusSource::Xml(EXAMPLE.to_string()))
            .await
            .unwrap();
        let before = store.summary().await.unwrap();

        let broken = SHARED_TERMS.replace(r#"e2="e3""#, r#"e2="e9""#);
        let result = store.repopulate(&CorpusSource::Xml(broken)).await;

        assert!(matches!(result, Err(IngestError::Parse(_))));
        assert_eq!(store.summary().await.unwrap(), before);
        assert_eq!(store.pending_counts(), CommitSummary::default());
    }
}
