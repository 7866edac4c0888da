//! Soil form and results view tests

mod common;

use agro_advisor::error::AdvisorError;
use agro_advisor::results::{ResultsLayout, ResultsView};
use agro_advisor::storage::{LocalStore, IMAGE_PATH_KEY};
use agro_advisor::workflow::{SaveOutcome, SoilWorkflow};
use agro_advisor_common::{CarriedLeafContext, Crop, Explanation, Lang, ResultParams, SoilColor, Translator};
use common::MockApi;
use tempfile::tempdir;

fn carried() -> CarriedLeafContext {
    CarriedLeafContext {
        disease: Some("Tomato___blight".into()),
        confidence: Some("0.87".into()),
        image: Some("uploads/abc.jpg".into()),
        care: Some("Remove affected leaves".into()),
        medicine: Some("Copper spray".into()),
    }
}

/// Blank nitrogen is sent as 0; a failed prediction still reaches results
#[tokio::test]
async fn test_soil_submit_error_path() {
    let api = MockApi::default();
    let t = Translator::new(Lang::En);

    let mut flow = SoilWorkflow::new();
    let form = flow.form_mut();
    form.nitrogen = "".into();
    form.phosphorus = "20".into();
    form.ph = "6.5".into();
    form.soil_color = Some(SoilColor::Black);
    form.crop = Some(Crop::Rice);

    let params = flow.submit(&api, &t).await;
    assert_eq!(params.fertilizer, "");
    assert_eq!(params.error.as_deref(), Some("Server error. Please try again."));
    assert_eq!(
        ResultsView::new(params.clone(), t).layout(),
        ResultsLayout::ErrorBanner("Server error. Please try again.".into())
    );

    let request = api.fertilizer_requests.lock().unwrap()[0].clone();
    assert_eq!(request.nitrogen, 0);
    assert_eq!(request.phosphorus, 20);
    assert_eq!(request.ph, 6.5);
    assert_eq!(request.crop, "Rice");
    assert_eq!(request.soil_color, "Black");

    let form = params.form.unwrap();
    assert_eq!(form.crop, "Rice");
    assert_eq!(form.nitrogen, "");
}

/// Carried leaf context fills the results and the crop
#[tokio::test]
async fn test_soil_submit_with_carried_context() {
    let api = MockApi::default();
    *api.fertilizer.lock().unwrap() = Some("Urea".into());
    let t = Translator::new(Lang::En);

    let mut flow = SoilWorkflow::new();
    assert!(flow.apply_carried(carried()));
    assert!(!flow.crop_selector_visible());

    let params = flow.submit(&api, &t).await;
    assert_eq!(params.fertilizer, "Urea");
    assert!(params.error.is_none());
    assert_eq!(params.disease, "Tomato___blight");
    assert_eq!(params.image, "uploads/abc.jpg");
    assert_eq!(params.form.as_ref().unwrap().crop, "Tomato");
    assert_eq!(api.fertilizer_requests.lock().unwrap()[0].crop, "Tomato");
    assert_eq!(ResultsView::new(params, t).layout(), ResultsLayout::Both);
}

/// Carried context is applied only once
#[test]
fn test_carried_context_once() {
    let mut flow = SoilWorkflow::new();
    assert!(flow.apply_carried(carried()));
    let other = CarriedLeafContext {
        disease: Some("Rice___brown_spot".into()),
        ..Default::default()
    };
    assert!(!flow.apply_carried(other));
    assert_eq!(flow.resolved_crop(), "Tomato");
}

/// With an image the soil+image collection is used; the marker goes away
#[tokio::test]
async fn test_results_save_with_image() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(&dir.path().join("storage.json"));
    store.set(IMAGE_PATH_KEY, "uploads/abc.jpg").unwrap();
    let api = MockApi::default();
    *api.fertilizer.lock().unwrap() = Some("Urea".into());
    let t = Translator::new(Lang::En);

    let mut flow = SoilWorkflow::new();
    flow.apply_carried(carried());
    flow.form_mut().nitrogen = "40".into();
    flow.form_mut().soil_color = Some(SoilColor::DarkBrown);
    let params = flow.submit(&api, &t).await;

    let mut view = ResultsView::new(params, t);
    let outcome = view.save(&api, &mut store).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Saved("Soil and leaf result saved.".into()));
    assert!(view.is_save_locked());
    assert!(!store.contains(IMAGE_PATH_KEY));

    let saved = api.soil_image_saves.lock().unwrap()[0].clone();
    assert_eq!(saved.nitrogen, 40);
    assert_eq!(saved.soil_color, "Dark Brown");
    assert_eq!(saved.crop_type, "Tomato");
    assert_eq!(saved.disease_detected, "Tomato___blight");
    assert_eq!(saved.image_url, "uploads/abc.jpg");
    assert_eq!(saved.recommended_fertilizer, "Urea");
    assert_eq!(saved.confidence, Some(0.87));
    assert_eq!(
        saved.treatment_suggestion.as_deref(),
        Some("Remove affected leaves | Copper spray")
    );

    assert_eq!(view.save(&api, &mut store).await.unwrap(), SaveOutcome::AlreadySaved);
    assert_eq!(api.call_count("save_soil_image"), 1);
    assert!(api.soil_saves.lock().unwrap().is_empty());
}

/// A store that cannot be written does not undo an accepted save
#[tokio::test]
async fn test_results_save_locks_when_marker_cleanup_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let mut store = LocalStore::open(&path);
    store.set(IMAGE_PATH_KEY, "uploads/abc.jpg").unwrap();
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let api = MockApi::default();
    *api.fertilizer.lock().unwrap() = Some("Urea".into());
    let t = Translator::new(Lang::En);

    let mut flow = SoilWorkflow::new();
    flow.form_mut().crop = Some(Crop::Rice);
    let params = flow.submit(&api, &t).await;
    let mut view = ResultsView::new(params, t);

    assert_eq!(
        view.save(&api, &mut store).await.unwrap(),
        SaveOutcome::Saved("Soil result saved.".into())
    );
    assert!(view.is_save_locked());
    assert_eq!(view.save(&api, &mut store).await.unwrap(), SaveOutcome::AlreadySaved);
    assert_eq!(api.soil_saves.lock().unwrap().len(), 1);
}

/// Without an image the soil-only collection is used; failure keeps save enabled
#[tokio::test]
async fn test_results_save_soil_only_failure_then_success() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(&dir.path().join("storage.json"));
    let api = MockApi::default();
    *api.fertilizer.lock().unwrap() = Some("DAP".into());
    *api.save_ok.lock().unwrap() = false;
    let t = Translator::new(Lang::En);

    let mut flow = SoilWorkflow::new();
    flow.form_mut().crop = Some(Crop::Potato);
    let params = flow.submit(&api, &t).await;
    let mut view = ResultsView::new(params, t);
    assert_eq!(view.layout(), ResultsLayout::FertilizerOnly);

    assert!(view.save(&api, &mut store).await.is_err());
    assert!(!view.is_save_locked());
    assert!(view.save_error().is_some());

    *api.save_ok.lock().unwrap() = true;
    assert_eq!(
        view.save(&api, &mut store).await.unwrap(),
        SaveOutcome::Saved("Soil result saved.".into())
    );
    let saved = api.soil_saves.lock().unwrap()[1].clone();
    assert_eq!(saved.crop_type, "Potato");
    assert_eq!(saved.predicted_fertilizer, "DAP");
    assert!(saved.predicted_treatment.is_none());
    assert_eq!(api.call_count("save_soil_image"), 0);
}

/// Saving needs the soil form snapshot
#[tokio::test]
async fn test_results_save_requires_form() {
    let dir = tempdir().unwrap();
    let mut store = LocalStore::open(&dir.path().join("storage.json"));
    let api = MockApi::default();
    let params = ResultParams {
        fertilizer: "Urea".into(),
        ..Default::default()
    };

    let mut view = ResultsView::new(params, Translator::new(Lang::En));
    let err = view.save(&api, &mut store).await.unwrap_err();
    assert!(matches!(err, AdvisorError::MissingSoilForm));
    assert_eq!(view.save_error(), Some("There is no soil data to save."));
    assert!(api.calls().is_empty());
}

/// Analysis prompt carries the soil form and asks for whyTreatment when treated
#[tokio::test]
async fn test_results_explain_prompt() {
    let api = MockApi::default();
    *api.fertilizer.lock().unwrap() = Some("Urea".into());
    *api.explanation.lock().unwrap() = Some(Explanation {
        why_fertilizer: Some("Urea adds nitrogen".into()),
        benefit: Some("Greener leaves".into()),
        ..Default::default()
    });
    let t = Translator::new(Lang::Bn);

    let mut flow = SoilWorkflow::new();
    flow.apply_carried(carried());
    let params = flow.submit(&api, &t).await;
    let mut view = ResultsView::new(params, t);
    let text = view.explain(&api).await.unwrap().to_string();
    assert!(text.contains("Urea adds nitrogen"));
    assert!(text.find("Urea adds nitrogen") < text.find("Greener leaves"));

    let request = api.explain_requests.lock().unwrap()[0].clone();
    assert!(request.content.starts_with("Analyze soil and leaf result."));
    assert!(request.content.contains("Fertilizer: Urea"));
    assert!(request.content.contains("Treatment: Remove affected leaves | Copper spray"));
    assert!(request.content.contains("Soil Form: {"));
    assert!(request.system_message.contains("whyTreatment"));
    assert!(request.system_message.ends_with("bangla"));
}
