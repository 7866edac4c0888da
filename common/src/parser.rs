//! API response parsers
//!
//! Turns raw backend bodies into domain values:
//! - parse_treatment: `care: ... | medicine: ...` strings
//! - decode_prediction: prediction body → PredictionResult
//! - decode_image_path / decode_fertilizer / decode_collection
//! - parse_explanation: the JSON payload embedded in an explain response

use crate::error::{Error, Result};
use crate::types::PredictionResult;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Treatment split into its recognized parts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Treatment {
    pub care: Option<String>,
    pub medicine: Option<String>,
    pub raw: String,
}

/// Parse a treatment string on `|`
///
/// Segments prefixed with `care:` or `medicine:` (any case, any whitespace
/// around the prefix) fill the matching field. The first occurrence wins.
///
/// # Examples
/// ```
/// use agro_advisor_common::parse_treatment;
///
/// let t = parse_treatment("medicine: Copper spray | CARE : Remove leaves");
/// assert_eq!(t.care.as_deref(), Some("Remove leaves"));
/// assert_eq!(t.medicine.as_deref(), Some("Copper spray"));
/// ```
pub fn parse_treatment(raw: &str) -> Treatment {
    lazy_static::lazy_static! {
        static ref CARE_RE: Regex = Regex::new(r"(?is)^\s*care\s*:\s*(.*?)\s*$").unwrap();
        static ref MEDICINE_RE: Regex = Regex::new(r"(?is)^\s*medicine\s*:\s*(.*?)\s*$").unwrap();
    }

    let mut treatment = Treatment {
        raw: raw.to_string(),
        ..Default::default()
    };

    for segment in raw.split('|') {
        if treatment.care.is_none() {
            if let Some(caps) = CARE_RE.captures(segment) {
                treatment.care = Some(caps[1].to_string());
                continue;
            }
        }
        if treatment.medicine.is_none() {
            if let Some(caps) = MEDICINE_RE.captures(segment) {
                treatment.medicine = Some(caps[1].to_string());
            }
        }
    }

    treatment
}

/// Fields a prediction body may carry
#[derive(Debug, Default, Deserialize)]
struct PredictionFields {
    prediction: Option<String>,
    predicted_class: Option<String>,
    label: Option<String>,
    disease: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    confidence: Option<f64>,
    treatment: Option<String>,
}

impl PredictionFields {
    /// Label priority: prediction > predicted_class > label > disease
    fn top_label(&self) -> Option<&str> {
        [
            &self.prediction,
            &self.predicted_class,
            &self.label,
            &self.disease,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
    }
}

/// Prediction body layouts, tried in declaration order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionBody {
    Enveloped { data: PredictionFields },
    Flat(PredictionFields),
}

/// Decode a prediction response
///
/// `{data: {...}}` is tried before the flat layout. Fails once, with
/// MalformedResponse, when no layout yields a label.
pub fn decode_prediction(body: &Value) -> Result<PredictionResult> {
    if body.is_null() {
        return Err(Error::MalformedResponse("empty prediction response".into()));
    }

    let fields = match PredictionBody::deserialize(body) {
        Ok(PredictionBody::Enveloped { data }) if data.top_label().is_some() => data,
        Ok(PredictionBody::Enveloped { .. }) => PredictionFields::deserialize(body)
            .map_err(|e| Error::MalformedResponse(format!("prediction response: {}", e)))?,
        Ok(PredictionBody::Flat(fields)) => fields,
        Err(e) => return Err(Error::MalformedResponse(format!("prediction response: {}", e))),
    };

    let top_label = fields
        .top_label()
        .ok_or_else(|| Error::MalformedResponse("prediction response carried no label".into()))?
        .to_string();

    let (care_text, medicine_text) = match fields.treatment.as_deref() {
        Some(raw) => {
            let t = parse_treatment(raw);
            (t.care, t.medicine)
        }
        None => (None, None),
    };

    Ok(PredictionResult {
        top_label,
        confidence: fields.confidence,
        care_text,
        medicine_text,
        raw_treatment_text: fields.treatment,
    })
}

/// Server-side image path from an upload response
///
/// Looks at the body and then its `data` object; key priority
/// `imagePath` > `path` > `imageUrl`.
pub fn decode_image_path(body: &Value) -> Result<String> {
    const KEYS: &[&str] = &["imagePath", "path", "imageUrl"];

    let scopes = [Some(body), body.get("data")];
    scopes
        .into_iter()
        .flatten()
        .flat_map(|scope| KEYS.iter().filter_map(move |k| scope.get(*k)))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedResponse("upload response carried no image path".into()))
}

/// Fertilizer name from `data.fertilizer`, else top-level `fertilizer`
pub fn decode_fertilizer(body: &Value) -> Option<String> {
    body.get("data")
        .and_then(|d| d.get("fertilizer"))
        .or_else(|| body.get("fertilizer"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A list collection: `data` when it is an array, else the body itself
pub fn decode_collection<T: DeserializeOwned>(body: Value) -> Result<Vec<T>> {
    let list = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Array(_)) => data,
            _ => return Ok(Vec::new()),
        },
        list @ Value::Array(_) => list,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(Error::MalformedResponse(format!(
                "expected a list, got {}",
                other
            )))
        }
    };
    Ok(serde_json::from_value(list)?)
}

/// `message` field of an error or success body, if any
pub fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `success` flag of a body; absent means the status code decides
pub fn success_flag(body: &Value) -> Option<bool> {
    body.get("success").and_then(Value::as_bool)
}

/// Locate a JSON object inside model output
///
/// Extraction order:
/// 1. ```json ... ``` block
/// 2. outermost `{ ... }`
/// 3. error
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("no JSON object found".into()))
}

/// Explanation sections returned by the explain endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Explanation {
    pub why_fertilizer: Option<String>,
    pub why_treatment: Option<String>,
    pub benefit: Option<String>,
    pub tips: Option<String>,
}

/// Parse an explain response body
///
/// The body is `{response: "<json string>"}`; the string may be wrapped in
/// prose or a fenced block. An already-decoded object is accepted too.
pub fn parse_explanation(body: &Value) -> Result<Explanation> {
    let payload = body.get("response").unwrap_or(body);

    let explanation = match payload {
        Value::String(text) => {
            let json_str = extract_json(text)?;
            serde_json::from_str::<Explanation>(json_str.trim())
                .map_err(|e| Error::Parse(format!("explanation JSON: {}", e)))?
        }
        Value::Object(_) => serde_json::from_value::<Explanation>(payload.clone())
            .map_err(|e| Error::Parse(format!("explanation JSON: {}", e)))?,
        _ => return Err(Error::Parse("explanation response carried no payload".into())),
    };

    Ok(explanation)
}

pub(crate) fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =============================================
    // parse_treatment
    // =============================================

    #[test]
    fn test_parse_treatment_both_parts() {
        let t = parse_treatment("care: Remove affected leaves | medicine: Copper spray");
        assert_eq!(t.care.as_deref(), Some("Remove affected leaves"));
        assert_eq!(t.medicine.as_deref(), Some("Copper spray"));
        assert_eq!(t.raw, "care: Remove affected leaves | medicine: Copper spray");
    }

    #[test]
    fn test_parse_treatment_any_order_and_case() {
        let t = parse_treatment("  MEDICINE :Mancozeb 2g/L|   Care:   Rotate crops  ");
        assert_eq!(t.care.as_deref(), Some("Rotate crops"));
        assert_eq!(t.medicine.as_deref(), Some("Mancozeb 2g/L"));
    }

    #[test]
    fn test_parse_treatment_without_prefixes() {
        let t = parse_treatment("Spray neem oil weekly");
        assert!(t.care.is_none());
        assert!(t.medicine.is_none());
        assert_eq!(t.raw, "Spray neem oil weekly");
    }

    #[test]
    fn test_parse_treatment_only_care() {
        let t = parse_treatment("care: water in the morning | something else");
        assert_eq!(t.care.as_deref(), Some("water in the morning"));
        assert!(t.medicine.is_none());
    }

    #[test]
    fn test_parse_treatment_text_containing_colon() {
        let t = parse_treatment("care: ratio 1:2 with water");
        assert_eq!(t.care.as_deref(), Some("ratio 1:2 with water"));
    }

    // =============================================
    // decode_prediction
    // =============================================

    #[test]
    fn test_decode_prediction_flat() {
        let body = json!({
            "prediction": "Tomato___blight",
            "confidence": 0.87,
            "treatment": "care: Remove affected leaves | medicine: Copper spray"
        });
        let result = decode_prediction(&body).unwrap();
        assert_eq!(result.top_label, "Tomato___blight");
        assert_eq!(result.confidence_percent(), Some(87));
        assert_eq!(result.care_text.as_deref(), Some("Remove affected leaves"));
        assert_eq!(result.medicine_text.as_deref(), Some("Copper spray"));
        assert!(result.raw_treatment_text.is_some());
    }

    #[test]
    fn test_decode_prediction_enveloped_takes_priority() {
        let body = json!({
            "success": true,
            "data": { "predicted_class": "Potato___Late_blight", "confidence": "0.91" }
        });
        let result = decode_prediction(&body).unwrap();
        assert_eq!(result.top_label, "Potato___Late_blight");
        assert_eq!(result.confidence, Some(0.91));
        assert!(result.care_text.is_none());
    }

    #[test]
    fn test_decode_prediction_label_priority() {
        let body = json!({ "label": "second", "prediction": "first" });
        assert_eq!(decode_prediction(&body).unwrap().top_label, "first");
    }

    #[test]
    fn test_decode_prediction_data_without_label_falls_back_to_flat() {
        let body = json!({ "data": { "note": "x" }, "disease": "Rice___blast" });
        assert_eq!(decode_prediction(&body).unwrap().top_label, "Rice___blast");
    }

    #[test]
    fn test_decode_prediction_missing_label() {
        let err = decode_prediction(&json!({ "confidence": 0.4 })).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
        assert!(decode_prediction(&Value::Null).is_err());
        assert!(decode_prediction(&json!({ "prediction": "   " })).is_err());
    }

    // =============================================
    // upload / fertilizer / collections
    // =============================================

    #[test]
    fn test_decode_image_path() {
        assert_eq!(
            decode_image_path(&json!({ "imagePath": "uploads/abc.jpg" })).unwrap(),
            "uploads/abc.jpg"
        );
        assert_eq!(
            decode_image_path(&json!({ "data": { "path": "uploads/x.png" } })).unwrap(),
            "uploads/x.png"
        );
        assert!(decode_image_path(&json!({ "success": true })).is_err());
    }

    #[test]
    fn test_decode_fertilizer() {
        assert_eq!(
            decode_fertilizer(&json!({ "data": { "fertilizer": "Urea" } })).as_deref(),
            Some("Urea")
        );
        assert_eq!(decode_fertilizer(&json!({ "fertilizer": "DAP" })).as_deref(), Some("DAP"));
        assert!(decode_fertilizer(&json!({})).is_none());
    }

    #[test]
    fn test_decode_collection_shapes() {
        let enveloped: Vec<Value> = decode_collection(json!({ "data": [1, 2] })).unwrap();
        assert_eq!(enveloped.len(), 2);
        let bare: Vec<Value> = decode_collection(json!([1, 2, 3])).unwrap();
        assert_eq!(bare.len(), 3);
        let empty: Vec<Value> = decode_collection(json!({ "message": "none" })).unwrap();
        assert!(empty.is_empty());
        assert!(decode_collection::<Value>(json!("oops")).is_err());
    }

    #[test]
    fn test_server_message_and_success() {
        let body = json!({ "success": false, "message": "Image not found" });
        assert_eq!(server_message(&body).as_deref(), Some("Image not found"));
        assert_eq!(success_flag(&body), Some(false));
        assert!(server_message(&json!({ "message": "  " })).is_none());
    }

    // =============================================
    // explanation
    // =============================================

    #[test]
    fn test_parse_explanation_string_payload() {
        let body = json!({
            "response": "{\"whyFertilizer\": \"Urea adds nitrogen\", \"tips\": \"Apply after rain\"}"
        });
        let e = parse_explanation(&body).unwrap();
        assert_eq!(e.why_fertilizer.as_deref(), Some("Urea adds nitrogen"));
        assert_eq!(e.tips.as_deref(), Some("Apply after rain"));
        assert!(e.benefit.is_none());
    }

    #[test]
    fn test_parse_explanation_fenced() {
        let body = json!({
            "response": "Sure:\n```json\n{\"benefit\": \"Higher yield\"}\n```"
        });
        assert_eq!(parse_explanation(&body).unwrap().benefit.as_deref(), Some("Higher yield"));
    }

    #[test]
    fn test_parse_explanation_invalid() {
        assert!(parse_explanation(&json!({ "response": "not json at all" })).is_err());
        assert!(parse_explanation(&json!({ "response": 5 })).is_err());
    }
}
