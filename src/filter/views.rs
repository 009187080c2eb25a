use serde::Serialize;
use std::collections::BTreeMap;

use crate::db_types::ImageDocument;
use crate::filter::FilterError;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Image counts keyed by month abbreviation, plus the `all` total.
pub type MonthCounter = BTreeMap<&'static str, usize>;

/// Counts documents per month. A month outside 1..=12 fails the whole count.
pub fn image_counts(docs: &[ImageDocument]) -> Result<MonthCounter, FilterError> {
    let mut counter = MonthCounter::new();
    counter.insert("all", 0);

    for doc in docs {
        let month = doc.date.month;
        let name = usize::try_from(month)
            .ok()
            .and_then(|m| m.checked_sub(1))
            .and_then(|index| MONTH_ABBREVIATIONS.get(index).copied())
            .ok_or_else(|| FilterError::InvalidMonth {
                id: doc.id.clone(),
                month,
            })?;

        *counter.entry(name).or_insert(0) += 1;
        *counter.entry("all").or_insert(0) += 1;
    }

    Ok(counter)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// GeoJSON order: `[lng, lat]`.
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDate {
    pub year: i32,
    pub month: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    pub doc_id: String,
    pub name: String,
    pub date: FeatureDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

/// Maps located documents to GeoJSON points; documents without coordinates are skipped.
pub fn feature_collection(docs: &[ImageDocument]) -> FeatureCollection {
    let features = docs
        .iter()
        .filter_map(|doc| {
            let (lng, lat) = doc.gps.lng_lat()?;
            Some(Feature {
                kind: "Feature",
                geometry: PointGeometry {
                    kind: "Point",
                    coordinates: [lng, lat],
                },
                properties: FeatureProperties {
                    doc_id: doc.id.clone(),
                    name: doc.filename.clone(),
                    date: FeatureDate {
                        year: doc.date.year,
                        month: doc.date.month,
                    },
                },
            })
        })
        .collect();

    FeatureCollection {
        kind: "FeatureCollection",
        features,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub lng: [f64; 2],
    pub lat: [f64; 2],
}

/// Axis-aligned box over located documents, `None` when nothing has coordinates.
pub fn bounding_box(docs: &[ImageDocument]) -> Option<BoundingBox> {
    docs.iter()
        .filter_map(|doc| doc.gps.lng_lat())
        .fold(None, |bbox: Option<BoundingBox>, (lng, lat)| {
            Some(match bbox {
                None => BoundingBox {
                    lng: [lng, lng],
                    lat: [lat, lat],
                },
                Some(b) => BoundingBox {
                    lng: [b.lng[0].min(lng), b.lng[1].max(lng)],
                    lat: [b.lat[0].min(lat), b.lat[1].max(lat)],
                },
            })
        })
}
