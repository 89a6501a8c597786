use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two entity categories of the corpus. Each kind lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Entity-1: miRNA mentions.
    Mirna,
    /// Entity-2: disease or gene mentions.
    DiseaseOrGene,
}

impl EntityKind {
    pub const ALL: [Self; 2] = [Self::Mirna, Self::DiseaseOrGene];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mirna => "mirna",
            Self::DiseaseOrGene => "disease_or_gene",
        }
    }

    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Mirna => "scaimc_mirna",
            Self::DiseaseOrGene => "scaimc_disease_or_gene",
        }
    }

    /// BEL function used when this kind becomes a graph node.
    #[must_use]
    pub fn bel_function(&self) -> &'static str {
        match self {
            Self::Mirna => "m",
            Self::DiseaseOrGene => "path",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mirna" | "e1" => Ok(Self::Mirna),
            "disease_or_gene" | "e2" => Ok(Self::DiseaseOrGene),
            _ => Err(crate::Error::InvalidEntityKind(s.to_string())),
        }
    }
}

/// Opaque key of an entity within its kind's table.
///
/// Keys are generated when the entity is first created, so a pending entity
/// and its persisted row share the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(Uuid);

impl EntityRef {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Character span of a mention inside its sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharOffsets {
    pub start: u32,
    pub end: u32,
}

impl CharOffsets {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for CharOffsets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl std::str::FromStr for CharOffsets {
    type Err = crate::Error;

    /// Parses `"start-end"`. Discontinuous spans (`"a-b,c-d"`) collapse to
    /// the covering span.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::InvalidOffsets(s.to_string());

        let mut covering: Option<Self> = None;
        for span in s.split(',') {
            let (start, end) = span.trim().split_once('-').ok_or_else(invalid)?;
            let start: u32 = start.trim().parse().map_err(|_| invalid())?;
            let end: u32 = end.trim().parse().map_err(|_| invalid())?;
            if end < start {
                return Err(invalid());
            }

            covering = Some(match covering {
                Some(c) => Self::new(c.start.min(start), c.end.max(end)),
                None => Self::new(start, end),
            });
        }

        covering.ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityRef,
    pub kind: EntityKind,
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsets: Option<CharOffsets>,
}

impl EntityRecord {
    #[must_use]
    pub fn new(kind: EntityKind, term: String) -> Self {
        Self {
            id: EntityRef::generate(),
            kind,
            term,
            entity_type: None,
            offsets: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, entity_type: String) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    #[must_use]
    pub fn with_offsets(mut self, offsets: CharOffsets) -> Self {
        self.offsets = Some(offsets);
        self
    }
}
