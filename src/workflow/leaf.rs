//! Leaf prediction workflow
//!
//! ```text
//! Idle → Uploading → Uploaded → Predicting → Predicted
//!      → (Explaining → Explained) → (Saving → Saved)
//! ```
//!
//! Upload and predict failures move to `Errored` and halt the chain;
//! the user has to pick again. Explain and save are manual, can fail
//! without leaving the current stage, and stay available while a result
//! exists.

use super::SaveOutcome;
use crate::acquire::{acquire, ImageSource, SelectedImage};
use crate::api::{AdvisorApi, ImageUpload, ProgressFn};
use crate::error::{AdvisorError, Result};
use crate::storage::{LocalStore, IMAGE_PATH_KEY};
use agro_advisor_common::records::ImageSaveRequest;
use agro_advisor_common::{build_leaf_prompt, render_explanation, CarriedLeafContext, PredictionResult, Translator};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafStage {
    Idle,
    Uploading,
    Uploaded,
    Predicting,
    Predicted,
    Explaining,
    Explained,
    Saving,
    Saved,
    Errored,
}

pub struct LeafWorkflow {
    t: Translator,
    stage: LeafStage,
    selection: Option<SelectedImage>,
    image_path: Option<String>,
    result: Option<PredictionResult>,
    error: Option<String>,
    explanation: Option<String>,
    explain_error: Option<String>,
    save_locked: bool,
    save_error: Option<String>,
}

impl LeafWorkflow {
    pub fn new(t: Translator) -> Self {
        Self {
            t,
            stage: LeafStage::Idle,
            selection: None,
            image_path: None,
            result: None,
            error: None,
            explanation: None,
            explain_error: None,
            save_locked: false,
            save_error: None,
        }
    }

    pub fn stage(&self) -> LeafStage {
        self.stage
    }

    pub fn selection(&self) -> Option<&SelectedImage> {
        self.selection.as_ref()
    }

    /// Server path of the uploaded image
    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    /// First upload/predict failure, localized
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
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

    /// Pick from a source
    ///
    /// Any failure (permission, size, format) leaves the current selection
    /// and result untouched. Returns whether a new image was selected.
    pub fn select(&mut self, source: &dyn ImageSource) -> Result<bool> {
        match acquire(source)? {
            Some(image) => {
                self.replace_selection(image);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the selection and forget everything derived from the old one
    pub fn replace_selection(&mut self, image: SelectedImage) {
        self.selection = Some(image);
        self.stage = LeafStage::Idle;
        self.image_path = None;
        self.result = None;
        self.error = None;
        self.explanation = None;
        self.explain_error = None;
        self.save_locked = false;
        self.save_error = None;
    }

    fn fail(&mut self, err: AdvisorError) -> AdvisorError {
        self.stage = LeafStage::Errored;
        self.error = Some(err.user_message(&self.t, "leafPredict:errUnknown"));
        err
    }

    /// Upload the selection; the returned server path is also written as
    /// the pending-image marker
    pub async fn upload<A: AdvisorApi>(
        &mut self,
        api: &A,
        store: &mut LocalStore,
        progress: ProgressFn,
    ) -> Result<String> {
        let Some(image) = self.selection.clone() else {
            return Err(self.fail(AdvisorError::NoImageSelected));
        };

        // an earlier unsaved upload is replaced by this one
        if let Some(previous) = store.get(IMAGE_PATH_KEY).map(str::to_string) {
            match api.delete_uploaded_image(&previous).await {
                Ok(()) => store.remove(IMAGE_PATH_KEY)?,
                Err(e) => warn!(path = %previous, error = %e, "could not delete previous upload"),
            }
        }

        self.stage = LeafStage::Uploading;
        self.error = None;
        let bytes = match tokio::fs::read(&image.path).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(e.into())),
        };
        let upload = ImageUpload {
            file_name: image.file_name.clone(),
            mime: image.mime.clone(),
            bytes,
        };

        match api.upload_image(upload, progress).await {
            Ok(path) => {
                if let Err(e) = store.set(IMAGE_PATH_KEY, &path) {
                    return Err(self.fail(e));
                }
                debug!(path = %path, "uploaded");
                self.image_path = Some(path.clone());
                self.stage = LeafStage::Uploaded;
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Predict against the uploaded path
    pub async fn predict<A: AdvisorApi>(&mut self, api: &A) -> Result<&PredictionResult> {
        let Some(path) = self.image_path.clone() else {
            return Err(self.fail(AdvisorError::NoImageSelected));
        };

        self.stage = LeafStage::Predicting;
        match api.predict_image(&path).await {
            Ok(result) => {
                info!(label = %result.top_label, confidence = ?result.confidence, "prediction");
                self.stage = LeafStage::Predicted;
                Ok(self.result.insert(result))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Upload then predict, halting on the first failure
    pub async fn run<A: AdvisorApi>(
        &mut self,
        api: &A,
        store: &mut LocalStore,
        progress: ProgressFn,
    ) -> Result<&PredictionResult> {
        self.upload(api, store, progress).await?;
        self.predict(api).await
    }

    /// Values handed to the soil form in combined mode
    pub fn carried_context(&self) -> Option<CarriedLeafContext> {
        let result = self.result.as_ref()?;
        Some(result.to_carried_context(self.image_path.as_deref().unwrap_or_default()))
    }

    /// Ask for an explanation of the current result
    ///
    /// On failure the localized generic message is kept in
    /// `explain_error` and the stage does not change.
    pub async fn explain<A: AdvisorApi>(&mut self, api: &A) -> Result<&str> {
        let Some(result) = self.result.as_ref() else {
            return Err(AdvisorError::NoResult);
        };
        let req = build_leaf_prompt(result, &self.t.disease_name(&result.top_label), self.t.lang());

        let previous = self.stage;
        self.stage = LeafStage::Explaining;
        self.explain_error = None;
        match api.explain(&req).await {
            Ok(explanation) => {
                self.stage = LeafStage::Explained;
                let text = render_explanation(&explanation, &self.t);
                Ok(self.explanation.insert(text).as_str())
            }
            Err(e) => {
                warn!(error = %e, "explain failed");
                self.stage = previous;
                self.explain_error = Some(self.t.t("soil-result:gptError.failed"));
                Err(e)
            }
        }
    }

    /// Save the current result as an image-only record
    ///
    /// Success locks saving and clears the pending marker; failure keeps
    /// saving available.
    pub async fn save<A: AdvisorApi>(&mut self, api: &A, store: &mut LocalStore) -> Result<SaveOutcome> {
        if self.save_locked {
            return Ok(SaveOutcome::AlreadySaved);
        }
        let (Some(result), Some(path)) = (self.result.as_ref(), self.image_path.as_deref()) else {
            return Err(AdvisorError::NoResult);
        };
        let req = ImageSaveRequest::new(result, path);

        let previous = self.stage;
        self.stage = LeafStage::Saving;
        self.save_error = None;
        match api.save_image(&req).await {
            Ok(reply) => {
                self.save_locked = true;
                self.stage = LeafStage::Saved;
                if let Err(e) = store.remove(IMAGE_PATH_KEY) {
                    warn!(error = %e, "could not clear pending image marker");
                }
                Ok(SaveOutcome::Saved(
                    reply.message.unwrap_or_else(|| self.t.t("leafPredict:save.success")),
                ))
            }
            Err(e) => {
                self.stage = previous;
                self.save_error = Some(e.user_message(&self.t, "common:unknown"));
                Err(e)
            }
        }
    }
}
