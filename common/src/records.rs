//! Saved records
//!
//! Three collections live on the backend: image-only, soil-only and
//! soil+image. The client merges them into one tagged list for the saved
//! and search views, and builds the bodies of the save calls.

use crate::parser::number_or_string;
use crate::soil::{parse_float_lenient, parse_int_lenient, ResultParams};
use crate::types::PredictionResult;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

/// Which collection a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Image,
    Soil,
    SoilImage,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Image, RecordKind::Soil, RecordKind::SoilImage];

    /// i18n key of the kind's display name
    pub fn label_key(&self) -> &'static str {
        match self {
            RecordKind::Image => "saved:tabs.imageOnly",
            RecordKind::Soil => "saved:tabs.soilOnly",
            RecordKind::SoilImage => "saved:tabs.soilImage",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '+', ' '], "-").as_str() {
            "image" | "img" => Ok(RecordKind::Image),
            "soil" => Ok(RecordKind::Soil),
            "soil-image" | "soilimage" | "both" => Ok(RecordKind::SoilImage),
            _ => Err(format!("Unknown record kind: {}. Use image, soil or soil-image", s)),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Image => write!(f, "image"),
            RecordKind::Soil => write!(f, "soil"),
            RecordKind::SoilImage => write!(f, "soil-image"),
        }
    }
}

/// Soil readings stored with soil and soil+image records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoilReadings {
    #[serde(deserialize_with = "number_or_string")]
    pub temperature: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub ph_level: Option<f64>,
    pub soil_color: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub rainfall: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub nitrogen: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub phosphorous: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub potassium: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub image_url: Option<String>,
    pub disease_name: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub confidence: Option<f64>,
    pub treatment: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoilRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub crop_type: Option<String>,
    pub predicted_fertilizer: Option<String>,
    pub predicted_treatment: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub confidence: Option<f64>,
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub readings: SoilReadings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoilImageRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub image_url: Option<String>,
    pub crop_type: Option<String>,
    pub disease_detected: Option<String>,
    pub recommended_fertilizer: Option<String>,
    pub treatment_suggestion: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub confidence: Option<f64>,
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub readings: SoilReadings,
}

/// One saved outcome, tagged by collection
#[derive(Debug, Clone, PartialEq)]
pub enum SavedRecord {
    ImageOnly(ImageRecord),
    SoilOnly(SoilRecord),
    SoilAndImage(SoilImageRecord),
}

impl SavedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            SavedRecord::ImageOnly(_) => RecordKind::Image,
            SavedRecord::SoilOnly(_) => RecordKind::Soil,
            SavedRecord::SoilAndImage(_) => RecordKind::SoilImage,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            SavedRecord::ImageOnly(r) => &r.id,
            SavedRecord::SoilOnly(r) => &r.id,
            SavedRecord::SoilAndImage(r) => &r.id,
        }
    }

    pub fn created_at(&self) -> Option<&str> {
        match self {
            SavedRecord::ImageOnly(r) => r.created_at.as_deref(),
            SavedRecord::SoilOnly(r) => r.created_at.as_deref(),
            SavedRecord::SoilAndImage(r) => r.created_at.as_deref(),
        }
    }

    /// Milliseconds since the epoch; missing or unreadable timestamps count as 0
    pub fn created_millis(&self) -> i64 {
        self.created_at().and_then(parse_timestamp_millis).unwrap_or(0)
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            SavedRecord::ImageOnly(r) => r.image_url.as_deref(),
            SavedRecord::SoilOnly(_) => None,
            SavedRecord::SoilAndImage(r) => r.image_url.as_deref(),
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            SavedRecord::ImageOnly(r) => r.confidence,
            SavedRecord::SoilOnly(r) => r.confidence,
            SavedRecord::SoilAndImage(r) => r.confidence,
        }
    }

    pub fn disease(&self) -> Option<&str> {
        match self {
            SavedRecord::ImageOnly(r) => r.disease_name.as_deref(),
            SavedRecord::SoilOnly(_) => None,
            SavedRecord::SoilAndImage(r) => r.disease_detected.as_deref(),
        }
    }

    pub fn crop(&self) -> Option<&str> {
        match self {
            SavedRecord::ImageOnly(_) => None,
            SavedRecord::SoilOnly(r) => r.crop_type.as_deref(),
            SavedRecord::SoilAndImage(r) => r.crop_type.as_deref(),
        }
    }

    pub fn fertilizer(&self) -> Option<&str> {
        match self {
            SavedRecord::ImageOnly(_) => None,
            SavedRecord::SoilOnly(r) => r.predicted_fertilizer.as_deref(),
            SavedRecord::SoilAndImage(r) => r.recommended_fertilizer.as_deref(),
        }
    }

    pub fn treatment(&self) -> Option<&str> {
        match self {
            SavedRecord::ImageOnly(r) => r.treatment.as_deref(),
            SavedRecord::SoilOnly(r) => r.predicted_treatment.as_deref(),
            SavedRecord::SoilAndImage(r) => r.treatment_suggestion.as_deref(),
        }
    }

    pub fn readings(&self) -> Option<&SoilReadings> {
        match self {
            SavedRecord::ImageOnly(_) => None,
            SavedRecord::SoilOnly(r) => Some(&r.readings),
            SavedRecord::SoilAndImage(r) => Some(&r.readings),
        }
    }

    /// Text fields the search view matches against
    pub fn search_fields(&self) -> Vec<&str> {
        let fields = match self {
            SavedRecord::ImageOnly(r) => vec![&r.disease_name, &r.treatment],
            SavedRecord::SoilOnly(r) => vec![
                &r.crop_type,
                &r.predicted_fertilizer,
                &r.predicted_treatment,
            ],
            SavedRecord::SoilAndImage(r) => vec![
                &r.crop_type,
                &r.disease_detected,
                &r.recommended_fertilizer,
                &r.treatment_suggestion,
            ],
        };
        fields.into_iter().filter_map(|f| f.as_deref()).collect()
    }

    /// Case-insensitive substring match on the search fields
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Merge the three collections into one tagged list (collection order kept)
pub fn merge_records(
    images: Vec<ImageRecord>,
    soils: Vec<SoilRecord>,
    soil_images: Vec<SoilImageRecord>,
) -> Vec<SavedRecord> {
    images
        .into_iter()
        .map(SavedRecord::ImageOnly)
        .chain(soils.into_iter().map(SavedRecord::SoilOnly))
        .chain(soil_images.into_iter().map(SavedRecord::SoilAndImage))
        .collect()
}

/// Newest first; ties keep their merge order
pub fn sort_newest_first(records: &mut [SavedRecord]) {
    records.sort_by_key(|r| Reverse(r.created_millis()));
}

/// Filter by query (blank query keeps everything), then sort newest first
pub fn search_records(records: Vec<SavedRecord>, query: &str) -> Vec<SavedRecord> {
    let mut found: Vec<SavedRecord> = records.into_iter().filter(|r| r.matches(query)).collect();
    sort_newest_first(&mut found);
    found
}

/// Parse a backend timestamp (RFC 3339, or naive ISO treated as UTC)
pub fn parse_timestamp_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Body of the image-only save call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSaveRequest {
    pub image_url: String,
    pub disease_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
}

impl ImageSaveRequest {
    pub fn new(result: &PredictionResult, image_path: &str) -> Self {
        Self {
            image_url: image_path.to_string(),
            disease_name: result.top_label.clone(),
            confidence: result.confidence,
            treatment: result.treatment_summary(),
        }
    }
}

/// Body of `POST /soil-model/save`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilSaveRequest {
    pub temperature: i64,
    pub ph_level: f64,
    pub soil_color: String,
    pub rainfall: i64,
    pub nitrogen: i64,
    pub phosphorous: i64,
    pub potassium: i64,
    pub crop_type: String,
    pub predicted_fertilizer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_treatment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Body of `POST /soil-and-image-model/save`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilImageSaveRequest {
    pub temperature: i64,
    pub ph_level: f64,
    pub soil_color: String,
    pub rainfall: i64,
    pub nitrogen: i64,
    pub phosphorous: i64,
    pub potassium: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub crop_type: String,
    pub disease_detected: String,
    pub image_url: String,
    pub recommended_fertilizer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_suggestion: Option<String>,
}

/// Save body chosen by whether the result carries an image
#[derive(Debug, Clone, PartialEq)]
pub enum SoilSave {
    SoilOnly(SoilSaveRequest),
    WithImage(SoilImageSaveRequest),
}

impl SoilSave {
    /// None when the params carry no soil form
    pub fn from_params(params: &ResultParams) -> Option<Self> {
        let form = params.form.as_ref()?;
        let save = if params.has_image() {
            SoilSave::WithImage(SoilImageSaveRequest {
                temperature: parse_int_lenient(&form.temperature),
                ph_level: parse_float_lenient(&form.ph),
                soil_color: form.soil_color.clone(),
                rainfall: parse_int_lenient(&form.rainfall),
                nitrogen: parse_int_lenient(&form.nitrogen),
                phosphorous: parse_int_lenient(&form.phosphorus),
                potassium: parse_int_lenient(&form.potassium),
                confidence: params.confidence_value(),
                crop_type: form.crop.clone(),
                disease_detected: params.disease.clone(),
                image_url: params.image.clone(),
                recommended_fertilizer: params.fertilizer.clone(),
                treatment_suggestion: params.treatment(),
            })
        } else {
            SoilSave::SoilOnly(SoilSaveRequest {
                temperature: parse_int_lenient(&form.temperature),
                ph_level: parse_float_lenient(&form.ph),
                soil_color: form.soil_color.clone(),
                rainfall: parse_int_lenient(&form.rainfall),
                nitrogen: parse_int_lenient(&form.nitrogen),
                phosphorous: parse_int_lenient(&form.phosphorus),
                potassium: parse_int_lenient(&form.potassium),
                crop_type: form.crop.clone(),
                predicted_fertilizer: params.fertilizer.clone(),
                predicted_treatment: params.treatment(),
                confidence: params.confidence_value(),
            })
        };
        Some(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::SoilFormSnapshot;
    use serde_json::json;

    fn image(id: &str, disease: &str, created: Option<&str>) -> SavedRecord {
        SavedRecord::ImageOnly(ImageRecord {
            id: id.into(),
            disease_name: Some(disease.into()),
            created_at: created.map(String::from),
            ..Default::default()
        })
    }

    fn soil(id: &str, crop: &str, fertilizer: &str, created: Option<&str>) -> SavedRecord {
        SavedRecord::SoilOnly(SoilRecord {
            id: id.into(),
            crop_type: Some(crop.into()),
            predicted_fertilizer: Some(fertilizer.into()),
            created_at: created.map(String::from),
            ..Default::default()
        })
    }

    #[test]
    fn test_record_deserialize_with_string_numbers() {
        let record: SoilImageRecord = serde_json::from_value(json!({
            "_id": "abc",
            "imageUrl": "uploads/leaf.jpg",
            "cropType": "Tomato",
            "diseaseDetected": "Tomato___Late_blight",
            "recommendedFertilizer": "Urea",
            "confidence": "0.93",
            "temperature": "28",
            "phLevel": 6.4,
            "createdAt": "2025-05-01T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.confidence, Some(0.93));
        assert_eq!(record.readings.temperature, Some(28.0));
        assert_eq!(record.readings.ph_level, Some(6.4));
        assert!(record.readings.nitrogen.is_none());
    }

    #[test]
    fn test_search_is_case_insensitive_per_kind() {
        let records = vec![
            image("1", "Tomato___Late_blight", None),
            soil("2", "Rice", "Urea", None),
            SavedRecord::SoilAndImage(SoilImageRecord {
                id: "3".into(),
                treatment_suggestion: Some("Copper SPRAY weekly".into()),
                ..Default::default()
            }),
        ];

        let blight = search_records(records.clone(), "BLIGHT");
        assert_eq!(blight.len(), 1);
        assert_eq!(blight[0].id(), "1");

        let urea = search_records(records.clone(), "urea");
        assert_eq!(urea.len(), 1);
        assert_eq!(urea[0].kind(), RecordKind::Soil);

        let spray = search_records(records.clone(), "spray");
        assert_eq!(spray.len(), 1);
        assert_eq!(spray[0].id(), "3");

        // image fertilizer is not a search field, crop of image-only records does not exist
        assert!(search_records(records, "nothing-here").is_empty());
    }

    #[test]
    fn test_empty_query_returns_all_sorted_newest_first() {
        let records = vec![
            image("old", "a", Some("2024-01-01T00:00:00Z")),
            soil("none", "Rice", "Urea", None),
            soil("new", "Rice", "Urea", Some("2025-03-01T12:00:00+06:00")),
            image("mid", "b", Some("2024-06-01T00:00:00.000Z")),
        ];
        let sorted = search_records(records, "   ");
        let ids: Vec<&str> = sorted.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["new", "mid", "old", "none"]);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp_millis("2025-01-02T03:04:05Z").is_some());
        assert!(parse_timestamp_millis("2025-01-02T03:04:05.123").is_some());
        assert!(parse_timestamp_millis("2025-01-02 03:04:05").is_some());
        assert!(parse_timestamp_millis("yesterday").is_none());
    }

    #[test]
    fn test_record_kind_parse() {
        assert_eq!("soil+image".parse::<RecordKind>().unwrap(), RecordKind::SoilImage);
        assert_eq!("Soil_Image".parse::<RecordKind>().unwrap(), RecordKind::SoilImage);
        assert_eq!("IMAGE".parse::<RecordKind>().unwrap(), RecordKind::Image);
        assert!("leaf".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_soil_save_picks_endpoint_shape_by_image() {
        let form = SoilFormSnapshot {
            nitrogen: "40".into(),
            ph: "6.5".into(),
            crop: "Rice".into(),
            soil_color: "Black".into(),
            ..Default::default()
        };
        let mut params = ResultParams {
            fertilizer: "Urea".into(),
            form: Some(form),
            ..Default::default()
        };

        match SoilSave::from_params(&params).unwrap() {
            SoilSave::SoilOnly(req) => {
                assert_eq!(req.nitrogen, 40);
                assert_eq!(req.ph_level, 6.5);
                assert_eq!(req.predicted_fertilizer, "Urea");
                assert!(req.predicted_treatment.is_none());
            }
            other => panic!("unexpected save shape: {:?}", other),
        }

        params.image = "uploads/abc.jpg".into();
        params.care = "Remove leaves".into();
        params.medicine = "Copper".into();
        match SoilSave::from_params(&params).unwrap() {
            SoilSave::WithImage(req) => {
                assert_eq!(req.image_url, "uploads/abc.jpg");
                assert_eq!(req.treatment_suggestion.as_deref(), Some("Remove leaves | Copper"));
                let body = serde_json::to_value(&req).unwrap();
                assert_eq!(body["recommendedFertilizer"], "Urea");
                assert_eq!(body["phosphorous"], 0);
            }
            other => panic!("unexpected save shape: {:?}", other),
        }

        params.form = None;
        assert!(SoilSave::from_params(&params).is_none());
    }
}
