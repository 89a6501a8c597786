mod parser;
mod pipeline;

pub use parser::{
    extract_pairs, extract_pairs_from_file, extract_source, EntityMention, ParseError,
    ParseResult, RawPairRow,
};
pub use pipeline::{IngestError, IngestPipeline, IngestResult, IngestStats};
