//! Soil form workflow
//!
//! Collects the soil readings, asks the backend for a fertilizer and
//! always ends in a `ResultParams` for the results view. A failed
//! prediction is reported through `ResultParams::error`, never as an Err.

use crate::api::AdvisorApi;
use agro_advisor_common::{CarriedLeafContext, ResultParams, SoilFormInput, Translator};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SoilWorkflow {
    form: SoilFormInput,
    carried: Option<CarriedLeafContext>,
    carried_applied: bool,
}

impl SoilWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over the leaf result; only the first non-empty context counts
    pub fn apply_carried(&mut self, ctx: CarriedLeafContext) -> bool {
        if self.carried_applied || ctx.is_empty() {
            return false;
        }
        debug!(disease = ?ctx.disease, "carried leaf context applied");
        self.carried = Some(ctx);
        self.carried_applied = true;
        true
    }

    pub fn carried(&self) -> Option<&CarriedLeafContext> {
        self.carried.as_ref()
    }

    /// The crop picker is hidden when a disease came along from the leaf flow
    pub fn crop_selector_visible(&self) -> bool {
        self.carried
            .as_ref()
            .and_then(|c| c.disease.as_deref())
            .map_or(true, str::is_empty)
    }

    pub fn form(&self) -> &SoilFormInput {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SoilFormInput {
        &mut self.form
    }

    pub fn resolved_crop(&self) -> String {
        self.form.resolve_crop(self.carried.as_ref())
    }

    /// Predict the fertilizer and build the results view params
    pub async fn submit<A: AdvisorApi>(&self, api: &A, t: &Translator) -> ResultParams {
        let crop = self.resolved_crop();
        let req = self.form.to_request(self.carried.as_ref());

        let mut params = ResultParams::from_carried(self.carried.as_ref());
        params.form = Some(self.form.snapshot(&crop));

        match api.predict_fertilizer(&req).await {
            Ok(fertilizer) => {
                debug!(crop = %crop, fertilizer = %fertilizer, "fertilizer predicted");
                params.fertilizer = fertilizer;
            }
            Err(e) => {
                warn!(crop = %crop, error = %e, "fertilizer prediction failed");
                params.fertilizer = String::new();
                params.error = Some(t.t("soil-result:serverError"));
            }
        }
        params
    }
}
