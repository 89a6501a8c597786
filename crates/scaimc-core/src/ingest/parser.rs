use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::entity::CharOffsets;
use crate::source::CorpusSource;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Pair {pair_id} references unknown entity {entity_id}")]
    UnknownEntity { pair_id: String, entity_id: String },
    #[error("<{element}> at line {line} is missing attribute {attribute:?}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        line: u32,
    },
    #[error("Entity {entity_id} has malformed charOffset {value:?}")]
    InvalidOffsets { entity_id: String, value: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// One side of an annotated pair, as written in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    pub entity_type: String,
    pub offsets: CharOffsets,
}

/// A flattened pair annotation with both entity mentions and its sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPairRow {
    pub pubmed_id: String,
    pub pair_id: String,
    pub e1: EntityMention,
    pub e2: EntityMention,
    pub sentence: String,
    pub interaction: String,
    pub interaction_type: String,
}

/// Extract every annotated pair from a corpus document.
///
/// Rows come out in document, sentence, then pair order. Sentences without a
/// `pair` child are skipped. A pair pointing at an entity id that is not
/// declared in its own sentence fails the whole document.
pub fn extract_pairs(xml: &str) -> ParseResult<Vec<RawPairRow>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for document in doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("document"))
    {
        let pubmed_id = document
            .attribute("origId")
            .or_else(|| document.attribute("pubmed_id"))
            .ok_or_else(|| missing(&doc, document, "document", "origId"))?;

        for sentence in document.descendants().filter(|n| n.has_tag_name("sentence")) {
            if !sentence.children().any(|n| n.has_tag_name("pair")) {
                skipped += 1;
                continue;
            }

            extract_sentence(&doc, sentence, pubmed_id, &mut rows)?;
        }
    }

    debug!(
        "extracted {} pairs, skipped {} sentences without pairs",
        rows.len(),
        skipped
    );

    Ok(rows)
}

fn extract_sentence(
    doc: &Document<'_>,
    sentence: Node<'_, '_>,
    pubmed_id: &str,
    rows: &mut Vec<RawPairRow>,
) -> ParseResult<()> {
    let entities = entity_lookup(doc, sentence)?;
    let sentence_text = required(doc, sentence, "sentence", "text")?;

    for pair in sentence.children().filter(|n| n.has_tag_name("pair")) {
        let pair_id = required(doc, pair, "pair", "id")?;
        let e1_id = required(doc, pair, "pair", "e1")?;
        let e2_id = required(doc, pair, "pair", "e2")?;

        let resolve = |entity_id: &str| {
            entities
                .get(entity_id)
                .copied()
                .ok_or_else(|| ParseError::UnknownEntity {
                    pair_id: pair_id.to_string(),
                    entity_id: entity_id.to_string(),
                })
        };

        let e1 = mention(doc, resolve(e1_id)?)?;
        let e2 = mention(doc, resolve(e2_id)?)?;

        rows.push(RawPairRow {
            pubmed_id: pubmed_id.to_string(),
            pair_id: pair_id.to_string(),
            e1,
            e2,
            sentence: sentence_text.to_string(),
            interaction: required(doc, pair, "pair", "interaction")?.to_string(),
            interaction_type: pair.attribute("type").unwrap_or_default().to_string(),
        });
    }

    Ok(())
}

/// Entity ids are only unique within their sentence.
fn entity_lookup<'a, 'input>(
    doc: &Document<'input>,
    sentence: Node<'a, 'input>,
) -> ParseResult<HashMap<&'a str, Node<'a, 'input>>> {
    sentence
        .descendants()
        .filter(|n| n.has_tag_name("entity"))
        .map(|entity| Ok((required(doc, entity, "entity", "id")?, entity)))
        .collect()
}

fn mention(doc: &Document<'_>, entity: Node<'_, '_>) -> ParseResult<EntityMention> {
    let offsets = required(doc, entity, "entity", "charOffset")?;

    Ok(EntityMention {
        text: required(doc, entity, "entity", "text")?.to_string(),
        entity_type: required(doc, entity, "entity", "type")?.to_string(),
        offsets: offsets.parse().map_err(|_| ParseError::InvalidOffsets {
            entity_id: entity.attribute("id").unwrap_or_default().to_string(),
            value: offsets.to_string(),
        })?,
    })
}

fn required<'a>(
    doc: &Document<'_>,
    node: Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
) -> ParseResult<&'a str> {
    node.attribute(attribute)
        .ok_or_else(|| missing(doc, node, element, attribute))
}

fn missing(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> ParseError {
    ParseError::MissingAttribute {
        element,
        attribute,
        line: doc.text_pos_at(node.range().start).row,
    }
}

pub async fn extract_pairs_from_file(path: &Path) -> ParseResult<Vec<RawPairRow>> {
    let xml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    extract_pairs(&xml)
}

/// Extract rows from every document of `source`, in order. Fails on the
/// first malformed document without returning partial rows.
pub async fn extract_source(source: &CorpusSource) -> ParseResult<Vec<RawPairRow>> {
    match source {
        CorpusSource::Xml(xml) => extract_pairs(xml),
        CorpusSource::File(path) => extract_pairs_from_file(path).await,
        CorpusSource::Files(paths) => {
            let mut rows = Vec::new();
            for path in paths {
                rows.extend(extract_pairs_from_file(path).await?);
            }
            Ok(rows)
        }
    }
}
