//! Prediction workflows
//!
//! - leaf: upload → predict → (explain) → (save)
//! - soil: soil form → fertilizer prediction → result params
//!
//! Each workflow owns its state; the API client and the local store are
//! passed in per call.

pub mod leaf;
pub mod soil;

pub use leaf::{LeafStage, LeafWorkflow};
pub use soil::SoilWorkflow;

use crate::api::AdvisorApi;
use crate::error::Result;
use crate::storage::{LocalStore, IMAGE_PATH_KEY};
use tracing::{debug, warn};

/// Result of pressing save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Saved now; message to show
    Saved(String),
    /// Save is locked after an earlier success; nothing was sent
    AlreadySaved,
}

/// Delete an upload left over from an earlier session
///
/// The marker is removed only when the delete call succeeds. Returns
/// whether anything was cleaned up; failures are logged and ignored.
pub async fn cleanup_pending<A: AdvisorApi>(api: &A, store: &mut LocalStore) -> Result<bool> {
    let Some(path) = store.get(IMAGE_PATH_KEY).map(str::to_string) else {
        return Ok(false);
    };
    match api.delete_uploaded_image(&path).await {
        Ok(()) => {
            store.remove(IMAGE_PATH_KEY)?;
            debug!(path = %path, "removed pending upload");
            Ok(true)
        }
        Err(e) => {
            warn!(path = %path, error = %e, "pending upload cleanup failed");
            Ok(false)
        }
    }
}
