use std::collections::HashMap;

use crate::filter::facet::{FilterField, ParseRule};
use crate::filter::FilterError;

/// Separator the client uses to join multiple selected values in one parameter.
/// An unescaped `+` arrives form-decoded as a space, so whitespace separates values too.
pub const VALUE_DELIMITER: char = '+';

/// Literal year value that selects the most recent collection.
pub const DEFAULT_YEAR: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

/// Constraint on one filterable field. `Unconstrained` means "match anything".
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldConstraint {
    #[default]
    Unconstrained,
    Month(i64),
    Values(Vec<FilterValue>),
}

impl FieldConstraint {
    pub fn is_constrained(&self) -> bool {
        !matches!(self, FieldConstraint::Unconstrained)
    }
}

/// Parsed filter for a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    constraints: [FieldConstraint; 8],
}

impl FilterCriteria {
    /// Parses raw query parameters. Unknown keys, empty values and malformed
    /// segments are dropped; they never fail the request. When a field has
    /// several aliases, the first listed alias with a usable value wins.
    pub fn from_query(raw: &HashMap<String, String>) -> Self {
        let mut criteria = FilterCriteria::default();
        for field in FilterField::ALL {
            let spec = field.spec();
            let constraint = spec
                .query_keys
                .iter()
                .filter_map(|key| raw.get(*key))
                .map(|value| parse_value(spec.parse, value))
                .find(FieldConstraint::is_constrained);
            if let Some(constraint) = constraint {
                criteria.set(field, constraint);
            }
        }
        criteria
    }

    pub fn get(&self, field: FilterField) -> &FieldConstraint {
        &self.constraints[field as usize]
    }

    pub fn set(&mut self, field: FilterField, constraint: FieldConstraint) {
        self.constraints[field as usize] = constraint;
    }

    pub fn month(&self) -> Option<i64> {
        match self.get(FilterField::Month) {
            FieldConstraint::Month(month) => Some(*month),
            _ => None,
        }
    }

    pub fn constrained_count(&self) -> usize {
        self.constraints
            .iter()
            .filter(|constraint| constraint.is_constrained())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.constrained_count() == 0
    }
}

fn parse_value(rule: ParseRule, raw: &str) -> FieldConstraint {
    let raw = raw.trim();
    if raw.is_empty() {
        return FieldConstraint::Unconstrained;
    }

    let values: Vec<FilterValue> = match rule {
        ParseRule::Integer => {
            return raw
                .parse()
                .map(FieldConstraint::Month)
                .unwrap_or(FieldConstraint::Unconstrained)
        }
        ParseRule::IntegerList => segments(raw)
            .filter_map(|segment| segment.parse().ok())
            .map(FilterValue::Int)
            .collect(),
        ParseRule::SpacedList => segments(raw)
            .map(|segment| FilterValue::Text(segment.replace('_', " ")))
            .collect(),
        ParseRule::List => segments(raw)
            .map(|segment| FilterValue::Text(segment.to_string()))
            .collect(),
    };

    if values.is_empty() {
        FieldConstraint::Unconstrained
    } else {
        FieldConstraint::Values(values)
    }
}

fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == VALUE_DELIMITER || c.is_whitespace())
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

/// Resolves the requested year against the available collection names.
///
/// `default` (or no year at all) picks the most recent collection. Collection
/// names are four-digit years, so the string maximum is the numeric maximum.
pub fn resolve_year(requested: Option<&str>, available: &[String]) -> Result<String, FilterError> {
    let requested = requested.map(str::trim).unwrap_or("");

    if requested.is_empty() || requested == DEFAULT_YEAR {
        return available
            .iter()
            .max()
            .cloned()
            .ok_or_else(|| FilterError::YearNotFound(DEFAULT_YEAR.to_string()));
    }

    if available.iter().any(|year| year == requested) {
        Ok(requested.to_string())
    } else {
        Err(FilterError::YearNotFound(requested.to_string()))
    }
}
