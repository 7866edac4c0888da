//! Backend API
//!
//! `AdvisorApi` is the seam between the workflows and the network. The
//! production implementation is [`HttpApi`]; tests use in-memory doubles.

mod client;

pub use client::HttpApi;

use crate::error::Result;
use agro_advisor_common::records::{ImageSaveRequest, RecordKind, SoilImageSaveRequest, SoilSaveRequest};
use agro_advisor_common::validate::{SignInRequest, SignUpRequest};
use agro_advisor_common::{
    ExplainRequest, Explanation, FertilizerRequest, ImageRecord, PredictionResult, SoilImageRecord,
    SoilRecord, User,
};
use std::future::Future;
use std::sync::Arc;

/// Upload progress callback, integer percent 0..=100
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

pub mod endpoints {
    pub const SIGN_IN: &str = "/user/signin";
    pub const SIGN_UP: &str = "/user/signup";
    pub const SIGN_OUT: &str = "/user/signout";
    pub const GET_USER: &str = "/user/get-user";
    pub const UPLOAD_IMAGE: &str = "/predict/upload-image";
    pub const PREDICT_IMAGE: &str = "/predict/predict-image";
    pub const DELETE_IMAGE: &str = "/predict/delete-image";
    pub const PREDICT_FERTILIZER: &str = "/predict/predict-fertilizer";
    pub const EXPLAIN: &str = "gpt/gpt-explain";
    pub const IMAGE_RECORDS: &str = "/model/image";
    pub const IMAGE_RECORDS_RECENT: &str = "/model/image/recent";
    pub const SOIL_SAVE: &str = "/soil-model/save";
    pub const SOIL_RECORDS: &str = "/soil-model/saved";
    pub const SOIL_IMAGE_SAVE: &str = "/soil-and-image-model/save";
    pub const SOIL_IMAGE_RECORDS: &str = "/soil-and-image-model/saved";

    use agro_advisor_common::RecordKind;

    /// Collection path a record of this kind is listed and deleted under
    pub fn records_path(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Image => IMAGE_RECORDS,
            RecordKind::Soil => SOIL_RECORDS,
            RecordKind::SoilImage => SOIL_IMAGE_RECORDS,
        }
    }
}

/// Image bytes ready for the multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// `message` of a successful call, if the server sent one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerReply {
    pub message: Option<String>,
}

/// Calls the workflows make against the backend
///
/// Non-2xx responses and `success: false` bodies come back as
/// `AdvisorError::Server`; bodies missing a required field as a
/// malformed-response error.
pub trait AdvisorApi: Send + Sync {
    fn sign_in(&self, req: &SignInRequest) -> impl Future<Output = Result<ServerReply>> + Send;

    fn sign_up(&self, req: &SignUpRequest) -> impl Future<Output = Result<ServerReply>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    fn get_user(&self) -> impl Future<Output = Result<User>> + Send;

    /// Returns the server path of the stored image
    fn upload_image(
        &self,
        upload: ImageUpload,
        progress: ProgressFn,
    ) -> impl Future<Output = Result<String>> + Send;

    fn predict_image(&self, image_path: &str) -> impl Future<Output = Result<PredictionResult>> + Send;

    fn delete_uploaded_image(&self, image_path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Returns the recommended fertilizer
    fn predict_fertilizer(&self, req: &FertilizerRequest) -> impl Future<Output = Result<String>> + Send;

    fn explain(&self, req: &ExplainRequest) -> impl Future<Output = Result<Explanation>> + Send;

    fn save_image(&self, req: &ImageSaveRequest) -> impl Future<Output = Result<ServerReply>> + Send;

    fn save_soil(&self, req: &SoilSaveRequest) -> impl Future<Output = Result<ServerReply>> + Send;

    fn save_soil_image(
        &self,
        req: &SoilImageSaveRequest,
    ) -> impl Future<Output = Result<ServerReply>> + Send;

    /// Image-only records; `recent` selects the search view's listing
    fn list_images(&self, recent: bool) -> impl Future<Output = Result<Vec<ImageRecord>>> + Send;

    fn list_soil(&self) -> impl Future<Output = Result<Vec<SoilRecord>>> + Send;

    fn list_soil_images(&self) -> impl Future<Output = Result<Vec<SoilImageRecord>>> + Send;

    fn delete_record(&self, kind: RecordKind, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Session cookies as a `name=value; ...` string, for persisting
    fn session_cookies(&self) -> Option<String>;

    fn restore_session(&self, cookies: &str);

    fn clear_session(&self);
}
