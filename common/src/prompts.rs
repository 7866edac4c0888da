//! Explain prompt generation
//!
//! Prompts sent to the explain endpoint:
//! - build_leaf_prompt: single leaf prediction
//! - build_analysis_prompt: combined soil + leaf result
//! - build_record_prompt: a saved record
//! - render_explanation: the parsed answer as display text

use crate::i18n::{Lang, Translator};
use crate::parser::Explanation;
use crate::records::{RecordKind, SavedRecord};
use crate::soil::ResultParams;
use crate::types::PredictionResult;
use serde::{Deserialize, Serialize};
use serde_json::json;

const NOT_AVAILABLE: &str = "N/A";

/// Body of `POST gpt/gpt-explain`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    pub content: String,
    pub system_message: String,
}

/// System message asking for a JSON answer with the given keys
pub fn build_system_message(keys: &[&str], lang: Lang) -> String {
    format!(
        "You're an agriculture expert. Explain simply for farmers. in json {{{}}} provide in {}",
        keys.join(", "),
        lang.prompt_name()
    )
}

fn confidence_text(confidence: Option<f64>) -> String {
    confidence
        .map(|c| c.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Prompt for a leaf prediction on its own
pub fn build_leaf_prompt(result: &PredictionResult, disease_label: &str, lang: Lang) -> ExplainRequest {
    let mut fields = vec![
        format!("Disease: {}", non_empty_or(disease_label, &result.top_label)),
        format!("Confidence: {}", confidence_text(result.confidence)),
    ];
    let treatment = result.treatment_summary();
    if let Some(treatment) = &treatment {
        fields.push(format!("Treatment: {}", treatment));
    }

    let mut keys = vec!["benefit", "tips"];
    if treatment.is_some() {
        keys.push("whyTreatment");
    }

    ExplainRequest {
        content: format!("Analyze leaf result. {}", fields.join(". ")),
        system_message: build_system_message(&keys, lang),
    }
}

/// Prompt for the combined results view
///
/// The soil form is embedded as JSON; treatment is always `care | medicine`.
pub fn build_analysis_prompt(params: &ResultParams, disease_label: &str, lang: Lang) -> ExplainRequest {
    let confidence = if params.confidence.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        params.confidence.trim().to_string()
    };
    let form = params
        .form
        .as_ref()
        .and_then(|f| serde_json::to_string(f).ok())
        .unwrap_or_else(|| "{}".to_string());

    let content = format!(
        "Analyze soil and leaf result. Disease: {}. Confidence: {}. Fertilizer: {}. Treatment: {} | {}. Soil Form: {}",
        non_empty_or(disease_label, &params.disease),
        confidence,
        non_empty_or(&params.fertilizer, NOT_AVAILABLE),
        params.care,
        params.medicine,
        form
    );

    let mut keys = vec!["whyFertilizer", "benefit", "tips"];
    if !params.care.is_empty() || !params.medicine.is_empty() {
        keys.push("whyTreatment");
    }

    ExplainRequest {
        content,
        system_message: build_system_message(&keys, lang),
    }
}

/// Prompt for a saved record from the details view
pub fn build_record_prompt(record: &SavedRecord, disease_label: &str, lang: Lang) -> ExplainRequest {
    let disease = record.disease().unwrap_or_default();
    let fertilizer = record
        .fertilizer()
        .filter(|f| !f.trim().is_empty() && record.kind() != RecordKind::Image);
    let treatment = record.treatment().filter(|t| !t.is_empty());

    let mut fields = vec![
        format!("Disease: {}", non_empty_or(disease_label, disease)),
        format!("Confidence: {}", confidence_text(record.confidence())),
    ];
    if let Some(fertilizer) = fertilizer {
        fields.push(format!("Fertilizer: {}", fertilizer));
    }
    if let Some(treatment) = treatment {
        fields.push(format!("Treatment: {}", treatment));
    }
    let context = match record.crop() {
        Some(crop) => json!({ "crop": crop }),
        None => json!({}),
    };
    fields.push(format!("Context: {}", context));

    let mut keys = Vec::new();
    if fertilizer.is_some() {
        keys.push("whyFertilizer");
    }
    keys.extend(["benefit", "tips"]);
    if treatment.is_some() {
        keys.push("whyTreatment");
    }

    ExplainRequest {
        content: format!("Analyze saved result. {}", fields.join(". ")),
        system_message: build_system_message(&keys, lang),
    }
}

/// Sections as `Header:\ntext`, separated by blank lines
///
/// Order: whyFertilizer, whyTreatment, benefit, tips. Empty sections are skipped.
pub fn render_explanation(explanation: &Explanation, t: &Translator) -> String {
    let sections = [
        ("whyFertilizer", &explanation.why_fertilizer),
        ("whyTreatment", &explanation.why_treatment),
        ("benefit", &explanation.benefit),
        ("tips", &explanation.tips),
    ];

    sections
        .iter()
        .filter_map(|(key, text)| {
            let text = text.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            let header = t.t(&format!("soil-result:results.explainedFields.{}", key));
            Some(format!("{}:\n{}", header, text))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
