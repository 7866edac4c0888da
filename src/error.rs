use agro_advisor_common::validate::FieldErrors;
use agro_advisor_common::Translator;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Image too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Not a supported image: {0}")]
    NotAnImage(String),

    #[error("No images found: {0}")]
    NoImagesFound(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status, or a 2xx body with `success: false`
    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    /// 409 on sign-up; `field` names the clashing form field
    #[error("Conflict: {}", .message.as_deref().unwrap_or("duplicate"))]
    Conflict {
        field: Option<String>,
        message: Option<String>,
    },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("No image selected")]
    NoImageSelected,

    #[error("No prediction result yet")]
    NoResult,

    #[error("No soil form to save")]
    MissingSoilForm,

    #[error("Cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Common(#[from] agro_advisor_common::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl AdvisorError {
    /// Message for the user
    ///
    /// A message sent by the server is shown verbatim; everything else maps
    /// to a localized string, with `fallback_key` for the generic case.
    pub fn user_message(&self, t: &Translator, fallback_key: &str) -> String {
        match self {
            AdvisorError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            AdvisorError::Conflict {
                message: Some(message),
                ..
            } => message.clone(),
            AdvisorError::Conflict { message: None, .. } => t.t("registration:errors.conflict"),
            AdvisorError::PayloadTooLarge { .. } => t.t("leafPredict:errSize"),
            AdvisorError::PermissionDenied(path) => {
                t.t_with("leafPredict:errPermission", &[("path", path)])
            }
            AdvisorError::NotAnImage(file) => t.t_with("leafPredict:errFormat", &[("file", file)]),
            AdvisorError::NoImagesFound(dir) => t.t_with("leafPredict:errEmpty", &[("dir", dir)]),
            AdvisorError::NoImageSelected => t.t("leafPredict:errNoImage"),
            AdvisorError::NoResult => t.t("leafPredict:noResult"),
            AdvisorError::MissingSoilForm => t.t("soil-result:save.missingSoilForm"),
            AdvisorError::NotLoggedIn => t.t("common:notLoggedIn"),
            AdvisorError::Unauthorized => t.t("common:sessionExpired"),
            AdvisorError::Transport(e) if e.is_timeout() => t.t("common:timeout"),
            AdvisorError::Transport(_) => t.t("common:network"),
            AdvisorError::Validation(errors) => errors
                .iter()
                .map(|(field, msg)| format!("{}: {}", field, msg))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => t.t(fallback_key),
        }
    }

    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            AdvisorError::Common(agro_advisor_common::Error::MalformedResponse(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
