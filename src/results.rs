//! Results view for a soil submission
//!
//! Shows the disease and/or the fertilizer, explains them on demand and
//! saves them as a soil-only or soil+image record.

use crate::api::AdvisorApi;
use crate::error::{AdvisorError, Result};
use crate::storage::{LocalStore, IMAGE_PATH_KEY};
use crate::workflow::SaveOutcome;
use agro_advisor_common::records::SoilSave;
use agro_advisor_common::soil::derive_crop_from_label;
use agro_advisor_common::{build_analysis_prompt, render_explanation, Crop, ResultParams, Translator};
use tracing::{debug, warn};

/// What the results view shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsLayout {
    ErrorBanner(String),
    Both,
    DiseaseOnly,
    FertilizerOnly,
    Empty,
}

pub fn layout(params: &ResultParams) -> ResultsLayout {
    if let Some(error) = params.error.as_ref().filter(|e| !e.is_empty()) {
        return ResultsLayout::ErrorBanner(error.clone());
    }
    let has_disease = !params.disease.trim().is_empty();
    let has_fertilizer = !params.fertilizer.trim().is_empty();
    match (has_disease, has_fertilizer) {
        (true, true) => ResultsLayout::Both,
        (true, false) => ResultsLayout::DiseaseOnly,
        (false, true) => ResultsLayout::FertilizerOnly,
        (false, false) => ResultsLayout::Empty,
    }
}

pub struct ResultsView {
    params: ResultParams,
    t: Translator,
    explanation: Option<String>,
    explain_error: Option<String>,
    save_locked: bool,
    save_error: Option<String>,
}

impl ResultsView {
    pub fn new(params: ResultParams, t: Translator) -> Self {
        Self {
            params,
            t,
            explanation: None,
            explain_error: None,
            save_locked: false,
            save_error: None,
        }
    }

    pub fn params(&self) -> &ResultParams {
        &self.params
    }

    pub fn layout(&self) -> ResultsLayout {
        layout(&self.params)
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn explain_error(&self) -> Option<&str> {
        self.explain_error.as_deref()
    }

    pub fn is_save_locked(&self) -> bool {
        self.save_locked
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    /// Disease label for display; localized only when the crop is known
    pub fn disease_label(&self) -> String {
        let disease = &self.params.disease;
        if derive_crop_from_label(disease).parse::<Crop>().is_err() {
            return disease.clone();
        }
        self.t.disease_name(disease)
    }

    pub async fn explain<A: AdvisorApi>(&mut self, api: &A) -> Result<&str> {
        let req = build_analysis_prompt(&self.params, &self.disease_label(), self.t.lang());
        self.explain_error = None;
        match api.explain(&req).await {
            Ok(explanation) => {
                let text = render_explanation(&explanation, &self.t);
                Ok(self.explanation.insert(text).as_str())
            }
            Err(e) => {
                warn!(error = %e, "explain failed");
                self.explain_error = Some(self.t.t("soil-result:gptError.failed"));
                Err(e)
            }
        }
    }

    /// Save to the soil+image collection when an image came along,
    /// otherwise to the soil-only one
    ///
    /// The pending-image marker is dropped once the call returns, whatever
    /// the outcome.
    pub async fn save<A: AdvisorApi>(&mut self, api: &A, store: &mut LocalStore) -> Result<SaveOutcome> {
        if self.save_locked {
            return Ok(SaveOutcome::AlreadySaved);
        }
        let Some(save) = SoilSave::from_params(&self.params) else {
            let err = AdvisorError::MissingSoilForm;
            self.save_error = Some(err.user_message(&self.t, "common:unknown"));
            return Err(err);
        };

        self.save_error = None;
        let (outcome, success_key) = match &save {
            SoilSave::WithImage(req) => (api.save_soil_image(req).await, "soil-result:save.savedSoilImage"),
            SoilSave::SoilOnly(req) => (api.save_soil(req).await, "soil-result:save.savedSoilOnly"),
        };

        let result = match outcome {
            Ok(reply) => {
                debug!(with_image = matches!(save, SoilSave::WithImage(_)), "soil result saved");
                self.save_locked = true;
                Ok(SaveOutcome::Saved(
                    reply.message.unwrap_or_else(|| self.t.t(success_key)),
                ))
            }
            Err(e) => {
                self.save_error = Some(e.user_message(&self.t, "common:unknown"));
                Err(e)
            }
        };
        if let Err(e) = store.remove(IMAGE_PATH_KEY) {
            warn!(error = %e, "could not clear pending image marker");
        }
        result
    }
}
