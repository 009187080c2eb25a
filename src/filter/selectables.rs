use serde::Serialize;
use std::collections::BTreeSet;

use crate::db_types::ImageDocument;

/// Distinct values per filterable field, used to populate the filter controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selectables {
    pub make: Vec<String>,
    pub model: Vec<String>,
    pub camera: Vec<String>,
    pub lens: Vec<String>,
    pub film: Vec<String>,
    pub focal_length: Vec<i64>,
    pub format_medium: Vec<String>,
    pub format_type: Vec<String>,
    pub tags: Vec<String>,
}

impl Selectables {
    pub fn collect(docs: &[ImageDocument]) -> Self {
        let mut make = BTreeSet::new();
        let mut model = BTreeSet::new();
        let mut camera = BTreeSet::new();
        let mut lens = BTreeSet::new();
        let mut film = BTreeSet::new();
        let mut focal_length = BTreeSet::new();
        let mut format_medium = BTreeSet::new();
        let mut format_type = BTreeSet::new();
        let mut tags = BTreeSet::new();

        for doc in docs {
            make.extend(doc.make.clone());
            model.extend(doc.model.clone());
            camera.extend(doc.camera());
            lens.extend(doc.lens.clone());
            film.extend(doc.film.clone());
            focal_length.extend(doc.focal_length_35mm);
            format_medium.extend(doc.format.medium.clone());
            format_type.extend(doc.format.kind.clone());
            tags.extend(doc.tags.iter().cloned());
        }

        Selectables {
            make: make.into_iter().collect(),
            model: model.into_iter().collect(),
            camera: camera.into_iter().collect(),
            lens: lens.into_iter().collect(),
            film: film.into_iter().collect(),
            focal_length: focal_length.into_iter().collect(),
            format_medium: format_medium.into_iter().collect(),
            format_type: format_type.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Selectables::default()
    }
}
