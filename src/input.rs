//! Entity id lists from delimited text (TSV/CSV exports, QuickStatements).

use crate::core::{EntityId, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref ENTITY_ID: Regex = Regex::new(r"\b[A-Z][0-9]+\b").unwrap();
}

/// First entity id on each line; lines without one are ignored.
///
/// Ids embedded in URIs (`<http://www.wikidata.org/entity/Q42>`) are found
/// as well.
pub fn parse_entity_ids(text: &str) -> Vec<EntityId> {
    text.lines()
        .filter_map(|line| ENTITY_ID.find(line))
        .map(|found| EntityId::new(found.as_str()))
        .collect()
}

pub async fn read_entity_ids(path: impl AsRef<Path>) -> Result<Vec<EntityId>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_entity_ids(&text))
}
