use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::db_types::{normalize_tags, CaptureDate, GpsPosition, ImageDocument};

const FORMAT_MEDIUMS: [&str; 2] = ["digital", "film"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateStatus {
    #[serde(rename = "successful")]
    Successful,
    #[serde(rename = "passed with error")]
    PassedWithError,
}

impl UpdateStatus {
    pub fn message(&self) -> &'static str {
        match self {
            UpdateStatus::Successful => "All edits OK!",
            UpdateStatus::PassedWithError => "Some edit(s) in wrong format.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl EditOutcome {
    pub fn status(&self) -> UpdateStatus {
        if self.skipped.is_empty() {
            UpdateStatus::Successful
        } else {
            UpdateStatus::PassedWithError
        }
    }
}

/// Flattens a JSON edit value to text. Null, empty strings and `false` mean "no edit".
pub fn edit_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Applies UI edit fields to a document. Malformed values are skipped and
/// reported rather than failing the whole edit.
pub fn apply_edits(doc: &mut ImageDocument, fields: &BTreeMap<String, Value>) -> EditOutcome {
    let mut outcome = EditOutcome::default();

    for (key, value) in fields {
        let Some(text) = edit_text(value) else {
            continue;
        };
        let applied = match key.as_str() {
            "Date" => parse_date(&text, doc.date.month)
                .filter(|date| date.year == doc.date.year)
                .map(|date| doc.date = date)
                .is_some(),
            "FocalLength" => parse_focal_length(&text)
                .map(|focal| doc.focal_length_35mm = Some(focal))
                .is_some(),
            "Format" => {
                let (medium, kind) = parse_format(&text);
                doc.format.medium = medium;
                doc.format.kind = kind;
                true
            }
            "Camera" => match text.split_once(' ') {
                Some((make, model)) if !model.trim().is_empty() => {
                    doc.make = Some(make.to_string());
                    doc.model = Some(model.trim().to_string());
                    true
                }
                _ => false,
            },
            "ISO" => text.parse().map(|iso| doc.iso = Some(iso)).is_ok(),
            "Tags" => {
                doc.tags = normalize_tags(text.split(','));
                true
            }
            "Coordinates" => parse_coordinates(&text)
                .map(|(lat, lng)| doc.gps = GpsPosition::from_signed(lat, lng))
                .is_some(),
            other => set_text_field(doc, &other.to_lowercase(), text),
        };

        if applied {
            outcome.applied.push(key.clone());
        } else {
            log::debug!("Skipped edit {}={:?} on {}", key, value, doc.id);
            outcome.skipped.push(key.clone());
        }
    }

    outcome
}

fn set_text_field(doc: &mut ImageDocument, key: &str, text: String) -> bool {
    let slot = match key {
        "title" => &mut doc.title,
        "description" => &mut doc.description,
        "film" => &mut doc.film,
        "lens" => &mut doc.lens,
        "url_thumb" => &mut doc.url_thumb,
        "filename" => {
            doc.filename = text;
            return true;
        }
        "url" => {
            doc.url = text;
            return true;
        }
        _ => return false,
    };
    *slot = Some(text);
    true
}

/// Parses `YYYY/MM/DD [time]`, `YYYY/MM` or `YYYY`. A bare year keeps `current_month`.
fn parse_date(text: &str, current_month: i64) -> Option<CaptureDate> {
    let (ymd, time) = match text.split_once(' ') {
        Some((ymd, time)) => (ymd, Some(time.trim().to_string())),
        None => (text, None),
    };

    let parts: Vec<&str> = ymd.split('/').collect();
    if parts.len() > 3 {
        return None;
    }
    let year: i32 = parts.first()?.parse().ok()?;
    let month: i64 = match parts.get(1) {
        Some(month) => month.parse().ok()?,
        None => current_month,
    };
    if !(1..=12).contains(&month) {
        return None;
    }
    let day = match parts.get(2) {
        Some(day) => Some(day.parse::<u32>().ok().filter(|d| (1..=31).contains(d))?),
        None => None,
    };

    Some(CaptureDate {
        year,
        month,
        day,
        time,
        taken: None,
    })
}

/// Keeps the digits of values like `50mm`.
fn parse_focal_length(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Splits `"<medium> <type>"`; whichever word is a known medium becomes the medium.
fn parse_format(text: &str) -> (Option<String>, Option<String>) {
    let mut medium = None;
    let mut kind = None;
    for word in text.split_whitespace().map(str::to_lowercase) {
        if FORMAT_MEDIUMS.contains(&word.as_str()) {
            medium = Some(word);
        } else {
            kind = Some(word);
        }
    }
    (medium, kind)
}

fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let mut coords = text.split(',').map(|c| c.trim().parse::<f64>());
    let lat = coords.next()?.ok()?;
    let lng = coords.next()?.ok()?;
    Some((lat, lng))
}
