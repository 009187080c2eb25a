use serde::{Deserialize, Serialize};

pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Capture date, stored as calendar subfields rather than one timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureDate {
    pub year: i32,
    pub month: i64,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub taken: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// GPS position in decimal degrees. Stored as `{lat, lng}`; GeoJSON output flips the order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsPosition {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lat_ref: Option<String>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub lng_ref: Option<String>,
}

impl GpsPosition {
    /// Builds a position from signed decimal degrees, nulling values outside the valid range.
    pub fn from_signed(lat: f64, lng: f64) -> Self {
        let lat_ref = if lat < 0.0 { "S" } else { "N" };
        let lng_ref = if lng < 0.0 { "W" } else { "E" };
        let mut gps = GpsPosition {
            lat: Some(lat),
            lat_ref: Some(lat_ref.to_string()),
            lng: Some(lng),
            lng_ref: Some(lng_ref.to_string()),
        };
        gps.clamp_to_valid();
        gps
    }

    pub fn clamp_to_valid(&mut self) {
        if self.lat.is_some_and(|lat| !LATITUDE_RANGE.contains(&lat)) {
            self.lat = None;
        }
        if self.lng.is_some_and(|lng| !LONGITUDE_RANGE.contains(&lng)) {
            self.lng = None;
        }
    }

    /// Returns `(lng, lat)` when both coordinates are present.
    pub fn lng_lat(&self) -> Option<(f64, f64)> {
        Some((self.lng?, self.lat?))
    }
}

/// One photograph in a yearly collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_thumb: Option<String>,

    pub date: CaptureDate,

    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub lens: Option<String>,
    #[serde(default)]
    pub film: Option<String>,

    #[serde(default)]
    pub iso: Option<i64>,
    #[serde(default)]
    pub aperture: Option<f64>,
    #[serde(default)]
    pub shutter_speed: Option<f64>,
    #[serde(default)]
    pub focal_length_35mm: Option<i64>,

    #[serde(default)]
    pub format: FormatInfo,
    #[serde(default)]
    pub gps: GpsPosition,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub owner: String,
}

impl ImageDocument {
    /// Camera label as shown in filter controls: make and model joined by a space.
    pub fn camera(&self) -> Option<String> {
        match (self.make.as_deref(), self.model.as_deref()) {
            (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
            _ => None,
        }
    }

    /// Name of the yearly collection this document belongs to.
    pub fn collection_name(&self) -> String {
        self.date.year.to_string()
    }

    /// Applies the ingestion invariants: lower-cased deduplicated tags, GPS in range.
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(self.tags.iter().map(String::as_str));
        self.gps.clamp_to_valid();
    }
}

pub fn normalize_tags<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Admin,
    Viewer,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::Viewer => "viewer",
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AccountRole::Admin),
            "viewer" => Ok(AccountRole::Viewer),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub role: AccountRole,
}
