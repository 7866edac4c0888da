//! Soil form
//!
//! Field coercion, crop resolution and the fertilizer request payload.
//! Blank numeric fields become 0; nothing here rejects a submission.

use crate::types::{CarriedLeafContext, Crop, SoilColor};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Raw soil form as typed by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoilFormInput {
    pub nitrogen: String,
    pub phosphorus: String,
    pub potassium: String,
    pub ph: String,
    pub temperature: String,
    pub rainfall: String,
    pub soil_color: Option<SoilColor>,
    pub crop: Option<Crop>,
}

/// Body of `POST /predict/predict-fertilizer`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FertilizerRequest {
    #[serde(rename = "Temperature")]
    pub temperature: i64,
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "Rainfall")]
    pub rainfall: i64,
    #[serde(rename = "Soil_color")]
    pub soil_color: String,
    #[serde(rename = "Nitrogen")]
    pub nitrogen: i64,
    #[serde(rename = "Potassium")]
    pub potassium: i64,
    #[serde(rename = "Phosphorus")]
    pub phosphorus: i64,
    #[serde(rename = "Crop")]
    pub crop: String,
}

/// Copy of the submitted form handed to the results view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoilFormSnapshot {
    pub nitrogen: String,
    pub phosphorus: String,
    pub potassium: String,
    pub ph: String,
    pub temperature: String,
    pub rainfall: String,
    pub soil_color: String,
    pub crop: String,
}

impl SoilFormInput {
    /// Crop sent to the model: explicit choice, else derived from the carried disease
    pub fn resolve_crop(&self, carried: Option<&CarriedLeafContext>) -> String {
        if let Some(crop) = self.crop {
            return crop.wire_name().to_string();
        }
        carried
            .and_then(|c| c.disease.as_deref())
            .map(derive_crop_from_label)
            .unwrap_or_default()
    }

    pub fn to_request(&self, carried: Option<&CarriedLeafContext>) -> FertilizerRequest {
        FertilizerRequest {
            temperature: parse_int_lenient(&self.temperature),
            ph: parse_float_lenient(&self.ph),
            rainfall: parse_int_lenient(&self.rainfall),
            soil_color: self
                .soil_color
                .map(|c| c.wire_name().to_string())
                .unwrap_or_default(),
            nitrogen: parse_int_lenient(&self.nitrogen),
            potassium: parse_int_lenient(&self.potassium),
            phosphorus: parse_int_lenient(&self.phosphorus),
            crop: self.resolve_crop(carried),
        }
    }

    pub fn snapshot(&self, crop: &str) -> SoilFormSnapshot {
        SoilFormSnapshot {
            nitrogen: self.nitrogen.clone(),
            phosphorus: self.phosphorus.clone(),
            potassium: self.potassium.clone(),
            ph: self.ph.clone(),
            temperature: self.temperature.clone(),
            rainfall: self.rainfall.clone(),
            soil_color: self
                .soil_color
                .map(|c| c.wire_name().to_string())
                .unwrap_or_default(),
            crop: crop.to_string(),
        }
    }
}

/// Crop prefix of a disease label
///
/// `Rice___bacterial_leaf_blight` → `Rice`; labels without `___` are split
/// on the first `_`.
pub fn derive_crop_from_label(label: &str) -> String {
    let prefix = match label.split_once("___") {
        Some((crop, _)) => crop,
        None => label.split('_').next().unwrap_or_default(),
    };
    prefix.trim().to_string()
}

/// Leading-integer parse; blank or non-numeric text gives 0
///
/// `"12.7"` → 12, `" 40kg"` → 40, `""` → 0
pub fn parse_int_lenient(text: &str) -> i64 {
    lazy_static::lazy_static! {
        static ref INT_RE: Regex = Regex::new(r"^\s*([+-]?\d+)").unwrap();
    }
    INT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .unwrap_or(0)
}

/// Leading-float parse; blank or non-numeric text gives 0.0
pub fn parse_float_lenient(text: &str) -> f64 {
    lazy_static::lazy_static! {
        static ref FLOAT_RE: Regex =
            Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap();
    }
    FLOAT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Everything the results view needs after a soil submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultParams {
    pub disease: String,
    pub confidence: String,
    pub image: String,
    pub care: String,
    pub medicine: String,
    pub fertilizer: String,
    pub form: Option<SoilFormSnapshot>,
    pub error: Option<String>,
}

impl ResultParams {
    /// Params seeded from the carried leaf context (fertilizer still empty)
    pub fn from_carried(carried: Option<&CarriedLeafContext>) -> Self {
        let owned = |value: Option<&String>| value.cloned().unwrap_or_default();
        Self {
            disease: owned(carried.and_then(|c| c.disease.as_ref())),
            confidence: owned(carried.and_then(|c| c.confidence.as_ref())),
            image: owned(carried.and_then(|c| c.image.as_ref())),
            care: owned(carried.and_then(|c| c.care.as_ref())),
            medicine: owned(carried.and_then(|c| c.medicine.as_ref())),
            ..Default::default()
        }
    }

    pub fn confidence_value(&self) -> Option<f64> {
        self.confidence.trim().parse::<f64>().ok()
    }

    pub fn has_image(&self) -> bool {
        !self.image.trim().is_empty()
    }

    /// `care | medicine` with empty parts dropped
    pub fn treatment(&self) -> Option<String> {
        let joined = [self.care.as_str(), self.medicine.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        Some(joined).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_coerce_to_zero() {
        let form = SoilFormInput {
            crop: Some(Crop::Rice),
            ..Default::default()
        };
        let req = form.to_request(None);
        assert_eq!(req.nitrogen, 0);
        assert_eq!(req.phosphorus, 0);
        assert_eq!(req.potassium, 0);
        assert_eq!(req.temperature, 0);
        assert_eq!(req.rainfall, 0);
        assert_eq!(req.ph, 0.0);
        assert_eq!(req.crop, "Rice");
        assert_eq!(req.soil_color, "");
    }

    #[test]
    fn test_request_wire_names() {
        let form = SoilFormInput {
            nitrogen: "".into(),
            ph: "6.5".into(),
            soil_color: Some(SoilColor::DarkBrown),
            crop: Some(Crop::Rice),
            ..Default::default()
        };
        let json = serde_json::to_value(form.to_request(None)).unwrap();
        assert_eq!(json["Nitrogen"], 0);
        assert_eq!(json["Crop"], "Rice");
        assert_eq!(json["pH"], 6.5);
        assert_eq!(json["Soil_color"], "Dark Brown");
        assert!(json.get("Disease").is_none());
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(parse_int_lenient("12.7"), 12);
        assert_eq!(parse_int_lenient("  40kg"), 40);
        assert_eq!(parse_int_lenient("-3"), -3);
        assert_eq!(parse_int_lenient("abc"), 0);
        assert_eq!(parse_float_lenient("6.8"), 6.8);
        assert_eq!(parse_float_lenient(".5"), 0.5);
        assert_eq!(parse_float_lenient("7ph"), 7.0);
        assert_eq!(parse_float_lenient(""), 0.0);
    }

    #[test]
    fn test_derive_crop_from_label() {
        assert_eq!(derive_crop_from_label("Rice___bacterial_leaf_blight"), "Rice");
        assert_eq!(derive_crop_from_label("Corn_(maize)___Common_rust_"), "Corn_(maize)");
        assert_eq!(derive_crop_from_label("Tomato_healthy"), "Tomato");
        assert_eq!(derive_crop_from_label(""), "");
    }

    #[test]
    fn test_crop_derived_from_carried_context() {
        let carried = CarriedLeafContext {
            disease: Some("Potato___Early_blight".into()),
            ..Default::default()
        };
        let form = SoilFormInput::default();
        assert_eq!(form.to_request(Some(&carried)).crop, "Potato");

        let explicit = SoilFormInput {
            crop: Some(Crop::Mango),
            ..Default::default()
        };
        assert_eq!(explicit.to_request(Some(&carried)).crop, "Mango");
    }

    #[test]
    fn test_result_params_from_carried() {
        let carried = CarriedLeafContext {
            disease: Some("Tomato___blight".into()),
            confidence: Some("0.87".into()),
            image: Some("uploads/abc.jpg".into()),
            care: Some("Remove affected leaves".into()),
            medicine: None,
        };
        let params = ResultParams::from_carried(Some(&carried));
        assert_eq!(params.disease, "Tomato___blight");
        assert_eq!(params.confidence_value(), Some(0.87));
        assert!(params.has_image());
        assert_eq!(params.treatment().as_deref(), Some("Remove affected leaves"));
        assert!(ResultParams::from_carried(None).treatment().is_none());
    }
}
