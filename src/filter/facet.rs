use sqlx::{QueryBuilder, Sqlite};

use crate::db_types::ImageDocument;
use crate::filter::criteria::{FieldConstraint, FilterCriteria, FilterValue};

/// How a facet compares the queried values against a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
    /// Document value equals the single queried value.
    Equality,
    /// Every queried value is present in the document's list (query ⊆ document).
    ForwardSubset,
    /// The document's single value is one of the queried values (document ⊆ query).
    ReverseSubset,
}

/// How raw query segments are turned into [`FilterValue`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRule {
    Integer,
    IntegerList,
    /// `+`-separated text where `_` stands in for a space.
    SpacedList,
    List,
}

/// Where a field lives inside the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPath {
    Json(&'static str),
    /// `make` and `model` joined by a space.
    CameraLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Month,
    FormatMedium,
    FormatType,
    Film,
    Camera,
    Lens,
    FocalLength,
    Tags,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub field: FilterField,
    pub query_keys: &'static [&'static str],
    pub facet_name: &'static str,
    pub path: DocumentPath,
    pub operator: MatchOperator,
    pub parse: ParseRule,
}

const FIELD_TABLE: [FieldSpec; 8] = [
    FieldSpec {
        field: FilterField::Month,
        query_keys: &["month"],
        facet_name: "getMonth",
        path: DocumentPath::Json("$.date.month"),
        operator: MatchOperator::Equality,
        parse: ParseRule::Integer,
    },
    FieldSpec {
        field: FilterField::FormatMedium,
        query_keys: &["format-medium"],
        facet_name: "getFormatMedium",
        path: DocumentPath::Json("$.format.medium"),
        operator: MatchOperator::ReverseSubset,
        parse: ParseRule::List,
    },
    FieldSpec {
        field: FilterField::FormatType,
        query_keys: &["format-type"],
        facet_name: "getFormatType",
        path: DocumentPath::Json("$.format.type"),
        operator: MatchOperator::ReverseSubset,
        parse: ParseRule::List,
    },
    FieldSpec {
        field: FilterField::Film,
        query_keys: &["film"],
        facet_name: "getFilm",
        path: DocumentPath::Json("$.film"),
        operator: MatchOperator::ReverseSubset,
        parse: ParseRule::SpacedList,
    },
    FieldSpec {
        field: FilterField::Camera,
        query_keys: &["camera"],
        facet_name: "getCamera",
        path: DocumentPath::CameraLabel,
        operator: MatchOperator::ReverseSubset,
        parse: ParseRule::SpacedList,
    },
    FieldSpec {
        field: FilterField::Lens,
        query_keys: &["lenses", "lens"],
        facet_name: "getLens",
        path: DocumentPath::Json("$.lens"),
        operator: MatchOperator::ReverseSubset,
        parse: ParseRule::SpacedList,
    },
    FieldSpec {
        field: FilterField::FocalLength,
        query_keys: &["focal-length"],
        facet_name: "getFocalLength",
        path: DocumentPath::Json("$.focal_length_35mm"),
        operator: MatchOperator::ReverseSubset,
        parse: ParseRule::IntegerList,
    },
    FieldSpec {
        field: FilterField::Tags,
        query_keys: &["tags"],
        facet_name: "getTags",
        path: DocumentPath::Json("$.tags"),
        operator: MatchOperator::ForwardSubset,
        parse: ParseRule::SpacedList,
    },
];

impl FilterField {
    pub const ALL: [FilterField; 8] = [
        FilterField::Month,
        FilterField::FormatMedium,
        FilterField::FormatType,
        FilterField::Film,
        FilterField::Camera,
        FilterField::Lens,
        FilterField::FocalLength,
        FilterField::Tags,
    ];

    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_TABLE[self as usize]
    }

    /// The document's value for a single-valued field. `None` for tags.
    fn document_value(self, doc: &ImageDocument) -> Option<FilterValue> {
        match self {
            FilterField::Month => Some(FilterValue::Int(doc.date.month)),
            FilterField::FormatMedium => doc.format.medium.clone().map(FilterValue::Text),
            FilterField::FormatType => doc.format.kind.clone().map(FilterValue::Text),
            FilterField::Film => doc.film.clone().map(FilterValue::Text),
            FilterField::Camera => doc.camera().map(FilterValue::Text),
            FilterField::Lens => doc.lens.clone().map(FilterValue::Text),
            FilterField::FocalLength => doc.focal_length_35mm.map(FilterValue::Int),
            FilterField::Tags => None,
        }
    }
}

/// One independent per-field filter over a whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPipeline {
    pub field: FilterField,
    pub operator: MatchOperator,
    pub values: Vec<FilterValue>,
}

impl FacetPipeline {
    pub fn name(&self) -> &'static str {
        self.field.spec().facet_name
    }

    /// In-memory form of the SQL predicate.
    pub fn matches(&self, doc: &ImageDocument) -> bool {
        match self.operator {
            MatchOperator::Equality => self
                .field
                .document_value(doc)
                .is_some_and(|value| self.values.first() == Some(&value)),
            MatchOperator::ForwardSubset => self.values.iter().all(|value| match value {
                FilterValue::Text(tag) => doc.tags.contains(tag),
                FilterValue::Int(_) => false,
            }),
            MatchOperator::ReverseSubset => self
                .field
                .document_value(doc)
                .is_some_and(|value| self.values.contains(&value)),
        }
    }

    /// Renders the facet as a query returning `(id, document)` rows in insertion order.
    pub fn to_query(&self, collection: &str, owner: &str) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT id, document FROM images WHERE collection = ");
        builder.push_bind(collection.to_string());
        builder.push(" AND owner = ");
        builder.push_bind(owner.to_string());
        builder.push(" AND ");

        match self.operator {
            MatchOperator::Equality => {
                builder.push(field_expression(self.field.spec().path));
                builder.push(" = ");
                match self.values.first() {
                    Some(value) => push_value(&mut builder, value),
                    None => {
                        builder.push("NULL");
                    }
                }
            }
            MatchOperator::ReverseSubset => {
                builder.push(field_expression(self.field.spec().path));
                builder.push(" IN (");
                push_value_list(&mut builder, &self.values);
                builder.push(")");
            }
            MatchOperator::ForwardSubset => {
                // Only list-valued fields use ForwardSubset.
                let DocumentPath::Json(path) = self.field.spec().path else {
                    builder.push("0 ORDER BY images.rowid");
                    return builder;
                };
                let mut distinct: Vec<FilterValue> = Vec::with_capacity(self.values.len());
                for value in &self.values {
                    if !distinct.contains(value) {
                        distinct.push(value.clone());
                    }
                }
                builder.push(format!(
                    "(SELECT COUNT(DISTINCT value) FROM json_each(images.document, '{}') WHERE value IN (",
                    path
                ));
                push_value_list(&mut builder, &distinct);
                builder.push(")) = ");
                builder.push_bind(distinct.len() as i64);
            }
        }

        builder.push(" ORDER BY images.rowid");
        builder
    }
}

fn field_expression(path: DocumentPath) -> String {
    match path {
        DocumentPath::Json(path) => format!("json_extract(document, '{}')", path),
        DocumentPath::CameraLabel => {
            "(json_extract(document, '$.make') || ' ' || json_extract(document, '$.model'))"
                .to_string()
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::Text(text) => builder.push_bind(text.clone()),
        FilterValue::Int(number) => builder.push_bind(*number),
    };
}

fn push_value_list(builder: &mut QueryBuilder<'static, Sqlite>, values: &[FilterValue]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(builder, value);
    }
}

/// Builds one pipeline per constrained field, in field-table order.
pub fn build_pipelines(criteria: &FilterCriteria) -> Vec<FacetPipeline> {
    FilterField::ALL
        .iter()
        .filter_map(|&field| {
            let values = match criteria.get(field) {
                FieldConstraint::Unconstrained => return None,
                FieldConstraint::Month(month) => vec![FilterValue::Int(*month)],
                FieldConstraint::Values(values) if values.is_empty() => return None,
                FieldConstraint::Values(values) => values.clone(),
            };
            Some(FacetPipeline {
                field,
                operator: field.spec().operator,
                values,
            })
        })
        .collect()
}

/// Per-facet candidate documents, kept in the order the pipelines ran.
#[derive(Debug, Default)]
pub struct FacetResults {
    pub facets: Vec<(FilterField, Vec<ImageDocument>)>,
}

impl FacetResults {
    pub fn push(&mut self, field: FilterField, docs: Vec<ImageDocument>) {
        self.facets.push((field, docs));
    }
}
