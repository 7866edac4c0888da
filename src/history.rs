//! Saved results and search
//!
//! Both views list the three record collections merged into one list,
//! newest first. They differ only in which image-only listing they read.

use crate::api::AdvisorApi;
use crate::auth::Auth;
use crate::error::{AdvisorError, Result};
use agro_advisor_common::records::sort_newest_first;
use agro_advisor_common::{
    build_record_prompt, merge_records, render_explanation, search_records, RecordKind, SavedRecord,
    Translator,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryView {
    Saved,
    Search,
}

#[derive(Debug, Clone)]
pub struct History {
    view: HistoryView,
    records: Vec<SavedRecord>,
}

impl History {
    /// Fetch every collection
    ///
    /// Signed-out users get `NotLoggedIn` without any request. The three
    /// listings run concurrently and the first failure wins.
    pub async fn load<A: AdvisorApi>(auth: &Auth, api: &A, view: HistoryView) -> Result<Self> {
        if !auth.is_logged_in() {
            return Err(AdvisorError::NotLoggedIn);
        }
        let records = fetch_all(api, view).await?;
        Ok(Self { view, records })
    }

    pub fn view(&self) -> HistoryView {
        self.view
    }

    /// Every record, newest first
    pub fn records(&self) -> &[SavedRecord] {
        &self.records
    }

    pub fn search(&self, query: &str) -> Vec<SavedRecord> {
        search_records(self.records.clone(), query)
    }

    pub fn by_kind(&self, kind: RecordKind) -> Vec<&SavedRecord> {
        self.records.iter().filter(|r| r.kind() == kind).collect()
    }

    pub fn find(&self, id: &str) -> Option<&SavedRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Delete after `confirm` agrees, then refetch everything
    ///
    /// Returns false when the user declined; nothing is sent then.
    pub async fn delete<A, F>(&mut self, api: &A, kind: RecordKind, id: &str, confirm: F) -> Result<bool>
    where
        A: AdvisorApi,
        F: FnOnce() -> Result<bool>,
    {
        if !confirm()? {
            debug!(kind = %kind, id = %id, "delete declined");
            return Ok(false);
        }
        api.delete_record(kind, id).await?;
        info!(kind = %kind, id = %id, "record deleted");
        self.records = fetch_all(api, self.view).await?;
        Ok(true)
    }
}

async fn fetch_all<A: AdvisorApi>(api: &A, view: HistoryView) -> Result<Vec<SavedRecord>> {
    let (images, soils, soil_images) = tokio::try_join!(
        api.list_images(view == HistoryView::Search),
        api.list_soil(),
        api.list_soil_images(),
    )?;
    debug!(
        images = images.len(),
        soils = soils.len(),
        soil_images = soil_images.len(),
        "records fetched"
    );
    let mut records = merge_records(images, soils, soil_images);
    sort_newest_first(&mut records);
    Ok(records)
}

/// Explain one saved record
pub async fn explain_record<A: AdvisorApi>(api: &A, record: &SavedRecord, t: &Translator) -> Result<String> {
    let disease = record.disease().unwrap_or_default();
    let req = build_record_prompt(record, &t.disease_name(disease), t.lang());
    let explanation = api.explain(&req).await?;
    Ok(render_explanation(&explanation, t))
}
