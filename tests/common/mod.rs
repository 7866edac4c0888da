//! In-memory backend for the workflow tests
//!
//! Every call is recorded by name; replies come from the scripted fields.
//! A `None` reply means the call fails with a 500.

#![allow(dead_code)]

use agro_advisor::api::{AdvisorApi, ImageUpload, ProgressFn, ServerReply};
use agro_advisor::error::{AdvisorError, Result};
use agro_advisor_common::records::{ImageSaveRequest, SoilImageSaveRequest, SoilSaveRequest};
use agro_advisor_common::validate::{SignInRequest, SignUpRequest};
use agro_advisor_common::{
    ExplainRequest, Explanation, FertilizerRequest, ImageRecord, PredictionResult, RecordKind,
    SoilImageRecord, SoilRecord, User,
};
use std::sync::Mutex;

pub struct MockApi {
    pub calls: Mutex<Vec<String>>,

    pub upload_path: Mutex<Option<String>>,
    pub prediction: Mutex<Option<PredictionResult>>,
    pub fertilizer: Mutex<Option<String>>,
    pub explanation: Mutex<Option<Explanation>>,
    pub save_ok: Mutex<bool>,
    pub delete_image_ok: Mutex<bool>,
    pub sign_in_ok: Mutex<bool>,
    pub user: Mutex<Option<User>>,

    pub images: Mutex<Vec<ImageRecord>>,
    pub soils: Mutex<Vec<SoilRecord>>,
    pub soil_images: Mutex<Vec<SoilImageRecord>>,

    pub uploads: Mutex<Vec<ImageUpload>>,
    pub fertilizer_requests: Mutex<Vec<FertilizerRequest>>,
    pub explain_requests: Mutex<Vec<ExplainRequest>>,
    pub image_saves: Mutex<Vec<ImageSaveRequest>>,
    pub soil_saves: Mutex<Vec<SoilSaveRequest>>,
    pub soil_image_saves: Mutex<Vec<SoilImageSaveRequest>>,
    pub cookies: Mutex<Option<String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            upload_path: Mutex::new(Some("uploads/abc.jpg".into())),
            prediction: Mutex::new(None),
            fertilizer: Mutex::new(None),
            explanation: Mutex::new(None),
            save_ok: Mutex::new(true),
            delete_image_ok: Mutex::new(true),
            sign_in_ok: Mutex::new(true),
            user: Mutex::new(None),
            images: Mutex::new(Vec::new()),
            soils: Mutex::new(Vec::new()),
            soil_images: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            fertilizer_requests: Mutex::new(Vec::new()),
            explain_requests: Mutex::new(Vec::new()),
            image_saves: Mutex::new(Vec::new()),
            soil_saves: Mutex::new(Vec::new()),
            soil_image_saves: Mutex::new(Vec::new()),
            cookies: Mutex::new(None),
        }
    }
}

pub fn server_error() -> AdvisorError {
    AdvisorError::Server {
        status: 500,
        message: None,
    }
}

impl MockApi {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn reply(&self) -> Result<ServerReply> {
        if *self.save_ok.lock().unwrap() {
            Ok(ServerReply::default())
        } else {
            Err(server_error())
        }
    }
}

impl AdvisorApi for MockApi {
    async fn sign_in(&self, req: &SignInRequest) -> Result<ServerReply> {
        self.record(format!("sign_in:{}", req.email));
        if *self.sign_in_ok.lock().unwrap() {
            *self.cookies.lock().unwrap() = Some("token=abc".into());
            Ok(ServerReply::default())
        } else {
            Err(AdvisorError::Server {
                status: 401,
                message: None,
            })
        }
    }

    async fn sign_up(&self, req: &SignUpRequest) -> Result<ServerReply> {
        self.record(format!("sign_up:{}", req.email));
        Ok(ServerReply {
            message: Some("Registered".into()),
        })
    }

    async fn sign_out(&self) -> Result<()> {
        self.record("sign_out");
        Ok(())
    }

    async fn get_user(&self) -> Result<User> {
        self.record("get_user");
        self.user.lock().unwrap().clone().ok_or(AdvisorError::Unauthorized)
    }

    async fn upload_image(&self, upload: ImageUpload, progress: ProgressFn) -> Result<String> {
        self.record(format!("upload_image:{}", upload.file_name));
        self.uploads.lock().unwrap().push(upload);
        let path = self.upload_path.lock().unwrap().clone();
        match path {
            Some(path) => {
                progress(100);
                Ok(path)
            }
            None => Err(server_error()),
        }
    }

    async fn predict_image(&self, image_path: &str) -> Result<PredictionResult> {
        self.record(format!("predict_image:{}", image_path));
        self.prediction.lock().unwrap().clone().ok_or_else(server_error)
    }

    async fn delete_uploaded_image(&self, image_path: &str) -> Result<()> {
        self.record(format!("delete_uploaded_image:{}", image_path));
        if *self.delete_image_ok.lock().unwrap() {
            Ok(())
        } else {
            Err(server_error())
        }
    }

    async fn predict_fertilizer(&self, req: &FertilizerRequest) -> Result<String> {
        self.record("predict_fertilizer");
        self.fertilizer_requests.lock().unwrap().push(req.clone());
        self.fertilizer.lock().unwrap().clone().ok_or_else(server_error)
    }

    async fn explain(&self, req: &ExplainRequest) -> Result<Explanation> {
        self.record("explain");
        self.explain_requests.lock().unwrap().push(req.clone());
        self.explanation.lock().unwrap().clone().ok_or_else(server_error)
    }

    async fn save_image(&self, req: &ImageSaveRequest) -> Result<ServerReply> {
        self.record("save_image");
        self.image_saves.lock().unwrap().push(req.clone());
        self.reply()
    }

    async fn save_soil(&self, req: &SoilSaveRequest) -> Result<ServerReply> {
        self.record("save_soil");
        self.soil_saves.lock().unwrap().push(req.clone());
        self.reply()
    }

    async fn save_soil_image(&self, req: &SoilImageSaveRequest) -> Result<ServerReply> {
        self.record("save_soil_image");
        self.soil_image_saves.lock().unwrap().push(req.clone());
        self.reply()
    }

    async fn list_images(&self, recent: bool) -> Result<Vec<ImageRecord>> {
        self.record(if recent { "list_images:recent" } else { "list_images" });
        Ok(self.images.lock().unwrap().clone())
    }

    async fn list_soil(&self) -> Result<Vec<SoilRecord>> {
        self.record("list_soil");
        Ok(self.soils.lock().unwrap().clone())
    }

    async fn list_soil_images(&self) -> Result<Vec<SoilImageRecord>> {
        self.record("list_soil_images");
        Ok(self.soil_images.lock().unwrap().clone())
    }

    async fn delete_record(&self, kind: RecordKind, id: &str) -> Result<()> {
        self.record(format!("delete_record:{}:{}", kind, id));
        match kind {
            RecordKind::Image => self.images.lock().unwrap().retain(|r| r.id != id),
            RecordKind::Soil => self.soils.lock().unwrap().retain(|r| r.id != id),
            RecordKind::SoilImage => self.soil_images.lock().unwrap().retain(|r| r.id != id),
        }
        Ok(())
    }

    fn session_cookies(&self) -> Option<String> {
        self.cookies.lock().unwrap().clone()
    }

    fn restore_session(&self, cookies: &str) {
        *self.cookies.lock().unwrap() = Some(cookies.to_string());
    }

    fn clear_session(&self) {
        *self.cookies.lock().unwrap() = None;
    }
}
