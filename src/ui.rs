//! Terminal front-end helpers
//!
//! Prompts (dialoguer), the upload progress bar (indicatif) and the
//! plain-text renderings of results, records and the profile.

use crate::acquire::{Chooser, PickedImage};
use crate::api::ProgressFn;
use crate::config::Config;
use crate::error::{AdvisorError, Result};
use crate::results::{ResultsLayout, ResultsView};
use crate::workflow::SoilWorkflow;
use agro_advisor_common::records::SoilReadings;
use agro_advisor_common::types::confidence_to_percent;
use agro_advisor_common::{
    Crop, PredictionResult, RegistrationForm, Role, SavedRecord, SoilColor, Translator, User,
};
use chrono::{DateTime, Local, TimeZone};
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Upload bar plus the callback that drives it
pub fn upload_progress(label: &str) -> (ProgressBar, ProgressFn) {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{msg} [{bar:30.green/white}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(label.to_string());

    let handle = bar.clone();
    let progress: ProgressFn = Arc::new(move |percent| handle.set_position(u64::from(percent)));
    (bar, progress)
}

/// Library chooser backed by a dialoguer select; Esc cancels
pub fn library_chooser(t: Translator) -> Chooser {
    Box::new(move |images: &[PickedImage]| -> Result<Option<usize>> {
        let items: Vec<String> = images
            .iter()
            .map(|img| format!("{} ({})", img.file_name, format_size(img.size_bytes)))
            .collect();
        let choice = Select::new()
            .with_prompt(t.t("leafPredict:source.library"))
            .items(&items)
            .default(0)
            .interact_opt()?;
        Ok(choice)
    })
}

pub fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn percent_text(confidence: Option<f64>, t: &Translator) -> String {
    confidence
        .map(|c| format!("{}%", confidence_to_percent(c)))
        .unwrap_or_else(|| t.t("common:notAvailable"))
}

fn text(input: &str, allow_empty: bool) -> Result<String> {
    Ok(Input::<String>::new()
        .with_prompt(input)
        .allow_empty(allow_empty)
        .interact_text()?)
}

/// Fill the soil form interactively
///
/// Numeric fields accept anything; blanks become 0 on submit. The crop
/// question is skipped when the leaf result already names one.
pub fn prompt_soil_form(flow: &mut SoilWorkflow, t: &Translator) -> Result<()> {
    let form = flow.form_mut();
    form.nitrogen = text(&t.t("soilInput:nitrogen"), true)?;
    form.phosphorus = text(&t.t("soilInput:phosphorus"), true)?;
    form.potassium = text(&t.t("soilInput:potassium"), true)?;
    form.ph = text(&t.t("soilInput:ph"), true)?;
    form.temperature = text(&t.t("soilInput:temperature"), true)?;
    form.rainfall = text(&t.t("soilInput:rainfall"), true)?;

    let colors: Vec<String> = SoilColor::ALL
        .iter()
        .map(|c| t.soil_color_name(c.wire_name()))
        .collect();
    let color = Select::new()
        .with_prompt(t.t("soilInput:soilColor"))
        .items(&colors)
        .default(0)
        .interact_opt()?;
    form.soil_color = color.and_then(|i| SoilColor::ALL.get(i).copied());

    if flow.crop_selector_visible() {
        let crops: Vec<String> = Crop::ALL.iter().map(|c| t.crop_name(c.wire_name())).collect();
        let crop = Select::new()
            .with_prompt(t.t("soilInput:crop"))
            .items(&crops)
            .default(0)
            .interact_opt()?;
        flow.form_mut().crop = crop.and_then(|i| Crop::ALL.get(i).copied());
    } else {
        let crop = flow.resolved_crop();
        println!("{}", t.t_with("soilInput:cropFromLeaf", &[("crop", &t.crop_name(&crop))]));
    }
    Ok(())
}

/// Ask for whatever the command line did not supply
pub fn prompt_login(email: Option<String>, t: &Translator) -> Result<(String, String)> {
    let email = match email {
        Some(email) => email,
        None => text(&t.t("login:email"), true)?,
    };
    let password = Password::new()
        .with_prompt(t.t("login:password"))
        .allow_empty_password(true)
        .interact()?;
    Ok((email, password))
}

pub fn prompt_registration(t: &Translator) -> Result<RegistrationForm> {
    let name = text(&t.t("registration:fields.name"), true)?;
    let email = text(&t.t("registration:fields.email"), true)?;
    let password = Password::new()
        .with_prompt(t.t("registration:fields.password"))
        .allow_empty_password(true)
        .interact()?;
    let phone = text(&t.t("registration:fields.phone"), true)?;

    let roles = [Role::Farmer, Role::Doctor];
    let labels: Vec<String> = roles
        .iter()
        .map(|r| t.t(&format!("registration:roles.{}", r)))
        .collect();
    let role = Select::new()
        .with_prompt(t.t("registration:fields.role"))
        .items(&labels)
        .default(0)
        .interact_opt()?
        .and_then(|i| roles.get(i).copied());

    Ok(RegistrationForm {
        name,
        email,
        password,
        phone,
        role,
        street: text(&t.t("registration:fields.address.street"), true)?,
        city: text(&t.t("registration:fields.address.city"), true)?,
        state: text(&t.t("registration:fields.address.state"), true)?,
    })
}

pub fn print_prediction(result: &PredictionResult, t: &Translator) {
    println!("\n{}", t.t("leafPredict:results"));
    println!("  {}: {}", t.t("leafPredict:disease"), t.disease_name(&result.top_label));
    println!("  {}: {}", t.t("leafPredict:confidence"), percent_text(result.confidence, t));
    match (&result.care_text, &result.medicine_text) {
        (None, None) => {
            if let Some(raw) = result.treatment_summary() {
                println!("  {}: {}", t.t("leafPredict:treatment"), raw);
            }
        }
        (care, medicine) => {
            if let Some(care) = care {
                println!("  {}: {}", t.t("leafPredict:care"), care);
            }
            if let Some(medicine) = medicine {
                println!("  {}: {}", t.t("leafPredict:medicine"), medicine);
            }
        }
    }
}

pub fn print_results(view: &ResultsView, t: &Translator, config: &Config) {
    let params = view.params();
    println!("\n{}", t.t("soil-result:title"));

    match view.layout() {
        ResultsLayout::ErrorBanner(message) => {
            println!("  ✗ {}", message);
            return;
        }
        ResultsLayout::Empty => {
            println!("  {}", t.t("soil-result:results.noRecommendation"));
            return;
        }
        _ => {}
    }

    if !params.disease.is_empty() {
        println!("  {}: {}", t.t("soil-result:results.disease"), view.disease_label());
        let confidence = params.confidence_value();
        println!("  {}: {}", t.t("soil-result:results.confidenceLabel"), percent_text(confidence, t));
    }
    if !params.fertilizer.is_empty() {
        println!("  {}: {}", t.t("soil-result:results.fertilizerLabel"), params.fertilizer);
    }
    if let Some(treatment) = params.treatment() {
        println!("  {}: {}", t.t("soil-result:results.treatmentLabel"), treatment);
    }
    if params.has_image() {
        println!("  {}: {}", t.t("saved:labels.image"), config.image_url(&params.image));
    }

    if let Some(form) = &params.form {
        println!("\n{}", t.t("soil-result:inputData.title"));
        let rows = [
            ("nitrogen", form.nitrogen.clone()),
            ("phosphorus", form.phosphorus.clone()),
            ("potassium", form.potassium.clone()),
            ("ph", form.ph.clone()),
            ("temperature", form.temperature.clone()),
            ("rainfall", form.rainfall.clone()),
            ("soilColor", t.soil_color_name(&form.soil_color)),
            ("crop", t.crop_name(&form.crop)),
        ];
        for (key, value) in rows {
            let value = if value.is_empty() { t.t("common:notAvailable") } else { value };
            println!("  {}: {}", t.t(&format!("soil-result:fields.{}", key)), value);
        }
    }
}

fn saved_at(record: &SavedRecord) -> String {
    let millis = record.created_millis();
    if millis == 0 {
        return record.created_at().unwrap_or("-").to_string();
    }
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => format_local(dt),
        None => "-".to_string(),
    }
}

fn format_local(dt: DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// One line per record for the list views
pub fn print_record_line(record: &SavedRecord, t: &Translator) {
    let headline = record
        .disease()
        .map(|d| t.disease_name(d))
        .or_else(|| record.crop().map(|c| t.crop_name(c)))
        .unwrap_or_else(|| t.t("common:notAvailable"));
    let fertilizer = record.fertilizer().map(|f| format!(" · {}", f)).unwrap_or_default();
    println!(
        "  [{}] {}{}  {}  ({})",
        t.t(record.kind().label_key()),
        headline,
        fertilizer,
        saved_at(record),
        record.id()
    );
}

pub fn print_record(record: &SavedRecord, t: &Translator, config: &Config) {
    println!("\n{} · {}", t.t("saved:detailsTitle"), t.t(record.kind().label_key()));
    println!("  {}: {}", t.t("saved:labels.recordId"), record.id());
    if let Some(disease) = record.disease() {
        println!("  {}: {}", t.t("saved:labels.disease"), t.disease_name(disease));
    }
    if let Some(crop) = record.crop() {
        println!("  {}: {}", t.t("saved:labels.crop"), t.crop_name(crop));
    }
    println!("  {}: {}", t.t("saved:labels.confidence"), percent_text(record.confidence(), t));
    if let Some(fertilizer) = record.fertilizer() {
        println!("  {}: {}", t.t("saved:labels.fertilizer"), fertilizer);
    }
    if let Some(treatment) = record.treatment() {
        println!("  {}: {}", t.t("saved:labels.treatment"), treatment);
    }
    if let Some(url) = record.image_url() {
        println!("  {}: {}", t.t("saved:labels.image"), config.image_url(url));
    }
    println!("  {}: {}", t.t("saved:labels.savedAt"), saved_at(record));
    if let Some(readings) = record.readings() {
        print_readings(readings, t);
    }
}

fn print_readings(readings: &SoilReadings, t: &Translator) {
    let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_else(|| t.t("common:notAvailable"));
    let rows = [
        ("nitrogen", number(readings.nitrogen)),
        ("phosphorus", number(readings.phosphorous)),
        ("potassium", number(readings.potassium)),
        ("ph", number(readings.ph_level)),
        ("temperature", number(readings.temperature)),
        ("rainfall", number(readings.rainfall)),
        (
            "soilColor",
            readings
                .soil_color
                .as_deref()
                .map(|c| t.soil_color_name(c))
                .unwrap_or_else(|| t.t("common:notAvailable")),
        ),
    ];
    for (key, value) in rows {
        println!("  {}: {}", t.t(&format!("soil-result:fields.{}", key)), value);
    }
}

pub fn print_profile(user: &User, t: &Translator) {
    println!("\n{} ({})", t.t("profile:title"), user.initials());
    println!("  {}: {}", t.t("profile:name"), user.name);
    println!("  {}: {}", t.t("profile:email"), user.email);
    let dash = t.t("common:notAvailable");
    println!("  {}: {}", t.t("profile:phone"), user.phone.as_deref().unwrap_or(&dash));
    println!("  {}: {}", t.t("profile:role"), user.role);
    if let Some(address) = &user.address {
        println!("  {}: {}", t.t("profile:street"), address.street.as_deref().unwrap_or(&dash));
        println!("  {}: {}", t.t("profile:city"), address.city.as_deref().unwrap_or(&dash));
        println!("  {}: {}", t.t("profile:state"), address.state.as_deref().unwrap_or(&dash));
    }
    println!("  {}: {}", t.t("profile:profileId"), user.id);
}

/// Shown instead of the history views when nobody is signed in
pub fn sign_in_prompt(t: &Translator) -> Vec<String> {
    vec![
        t.t("profile:noProfile.title"),
        t.t("profile:noProfile.message"),
        t.t("saved:signInPrompt"),
    ]
}

pub fn print_sign_in_prompt(t: &Translator) {
    for line in sign_in_prompt(t) {
        println!("{}", line);
    }
}

/// User-facing line for a failure, with `fallback_key` for anything generic
pub fn error_line(err: &AdvisorError, t: &Translator, fallback_key: &str) -> String {
    format!("✗ {}", err.user_message(t, fallback_key))
}
