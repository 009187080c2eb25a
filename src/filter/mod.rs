//! Faceted filtering over a year's image documents.
//!
//! Raw query parameters are parsed into [`FilterCriteria`], turned into one
//! [`FacetPipeline`] per constrained field, executed by the store, and the
//! per-facet results are intersected by document id. Derived views (month
//! counter, GeoJSON, bounds) and the selectable filter values are computed
//! from the surviving documents in memory.

pub mod criteria;
pub mod facet;
pub mod intersect;
pub mod selectables;
pub mod views;

pub use criteria::{resolve_year, FieldConstraint, FilterCriteria, FilterValue};
pub use facet::{build_pipelines, FacetPipeline, FacetResults, FilterField, MatchOperator};
pub use intersect::intersect_facets;
pub use selectables::Selectables;
pub use views::{bounding_box, feature_collection, image_counts, BoundingBox, FeatureCollection};

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Collection not found for year '{0}'")]
    YearNotFound(String),
    #[error("Document {id} has invalid month {month}")]
    InvalidMonth { id: String, month: i64 },
}
