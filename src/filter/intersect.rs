use std::collections::HashSet;

use crate::db_types::ImageDocument;
use crate::filter::facet::FacetResults;

/// Keeps the documents present in every facet, matched by `_id`.
///
/// Order follows the first facet. A single facet passes through unchanged and
/// any empty facet empties the result.
pub fn intersect_facets(results: FacetResults) -> Vec<ImageDocument> {
    let mut facets = results.facets.into_iter();
    let Some((_, first)) = facets.next() else {
        return Vec::new();
    };

    let id_sets: Vec<HashSet<String>> = facets
        .map(|(_, docs)| docs.into_iter().map(|doc| doc.id).collect())
        .collect();

    first
        .into_iter()
        .filter(|doc| id_sets.iter().all(|ids| ids.contains(&doc.id)))
        .collect()
}
