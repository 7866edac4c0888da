//! reqwest implementation of `AdvisorApi`
//!
//! One client per process, built from `Config`: shared cookie jar for the
//! session, one request timeout, no retries.

use super::{endpoints, AdvisorApi, ImageUpload, ProgressFn, ServerReply};
use crate::config::Config;
use crate::error::{AdvisorError, Result};
use agro_advisor_common::records::{ImageSaveRequest, RecordKind, SoilImageSaveRequest, SoilSaveRequest};
use agro_advisor_common::validate::{conflict_field, SignInRequest, SignUpRequest};
use agro_advisor_common::{
    decode_collection, decode_fertilizer, decode_image_path, decode_prediction, parse_explanation,
    server_message, success_flag, Error as CommonError, ExplainRequest, Explanation,
    FertilizerRequest, ImageRecord, PredictionResult, SoilImageRecord, SoilRecord, User,
};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const UPLOAD_CHUNK: usize = 64 * 1024;

pub struct HttpApi {
    client: Client,
    base: Url,
    jar: Arc<Jar>,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let base_str = format!("{}/", config.backend_url.trim_end_matches('/'));
        let base = Url::parse(&base_str)
            .map_err(|e| AdvisorError::Config(format!("invalid backend_url {}: {}", config.backend_url, e)))?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(config.timeout())
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self { client, base, jar })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| AdvisorError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Value> {
        debug!(path, "request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(path, status = status.as_u16(), "response");
        check_response(status, &text)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let request = self.client.get(self.url(path)?);
        self.send(request, path).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let request = self.client.post(self.url(path)?).json(body);
        self.send(request, path).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        let request = self.client.delete(self.url(path)?);
        self.send(request, path).await
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let body = self.get(path).await?;
        Ok(decode_collection(body)?)
    }
}

/// Decode a body and apply the failure rules
///
/// - non-2xx → `Server` (409 → `Conflict`)
/// - 2xx with `success: false` → `Server`
/// - empty body → `Null`, non-JSON body → string value
pub(crate) fn check_response(status: StatusCode, text: &str) -> Result<Value> {
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    };
    let message = server_message(&body);

    if status == StatusCode::CONFLICT {
        let field = conflict_field(&body, message.as_deref().unwrap_or_default());
        return Err(AdvisorError::Conflict { field, message });
    }
    if !status.is_success() || success_flag(&body) == Some(false) {
        return Err(AdvisorError::Server {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

fn reply(body: &Value) -> ServerReply {
    ServerReply {
        message: server_message(body),
    }
}

fn upload_body(bytes: Vec<u8>, progress: ProgressFn) -> Body {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    progress(0);
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        progress(percent(sent, total));
        Ok::<_, std::io::Error>(chunk)
    }));
    Body::wrap_stream(stream)
}

pub(crate) fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

impl AdvisorApi for HttpApi {
    async fn sign_in(&self, req: &SignInRequest) -> Result<ServerReply> {
        let body = self.post(endpoints::SIGN_IN, req).await?;
        Ok(reply(&body))
    }

    async fn sign_up(&self, req: &SignUpRequest) -> Result<ServerReply> {
        let body = self.post(endpoints::SIGN_UP, req).await?;
        Ok(reply(&body))
    }

    async fn sign_out(&self) -> Result<()> {
        self.get(endpoints::SIGN_OUT).await?;
        Ok(())
    }

    async fn get_user(&self) -> Result<User> {
        let body = match self.get(endpoints::GET_USER).await {
            Err(AdvisorError::Server { status: 401, .. }) => return Err(AdvisorError::Unauthorized),
            other => other?,
        };
        let user = body
            .get("user")
            .or_else(|| body.get("data"))
            .cloned()
            .unwrap_or(body);
        if !user.is_object() {
            return Err(CommonError::MalformedResponse("get-user returned no user".into()).into());
        }
        Ok(serde_json::from_value(user)?)
    }

    async fn upload_image(&self, upload: ImageUpload, progress: ProgressFn) -> Result<String> {
        let length = upload.bytes.len() as u64;
        let part = Part::stream_with_length(upload_body(upload.bytes, progress), length)
            .file_name(upload.file_name)
            .mime_str(&upload.mime)?;
        let form = Form::new().part("image", part);

        let request = self
            .client
            .post(self.url(endpoints::UPLOAD_IMAGE)?)
            .multipart(form);
        let body = self.send(request, endpoints::UPLOAD_IMAGE).await?;
        Ok(decode_image_path(&body)?)
    }

    async fn predict_image(&self, image_path: &str) -> Result<PredictionResult> {
        let body = self
            .post(endpoints::PREDICT_IMAGE, &json!({ "imagePath": image_path }))
            .await?;
        Ok(decode_prediction(&body)?)
    }

    async fn delete_uploaded_image(&self, image_path: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(endpoints::DELETE_IMAGE)?)
            .json(&json!({ "imageUrl": image_path }));
        self.send(request, endpoints::DELETE_IMAGE).await?;
        Ok(())
    }

    async fn predict_fertilizer(&self, req: &FertilizerRequest) -> Result<String> {
        let body = self.post(endpoints::PREDICT_FERTILIZER, req).await?;
        decode_fertilizer(&body)
            .ok_or_else(|| CommonError::MalformedResponse("no fertilizer in response".into()).into())
    }

    async fn explain(&self, req: &ExplainRequest) -> Result<Explanation> {
        let body = self.post(endpoints::EXPLAIN, req).await?;
        Ok(parse_explanation(&body)?)
    }

    async fn save_image(&self, req: &ImageSaveRequest) -> Result<ServerReply> {
        let body = self.post(endpoints::IMAGE_RECORDS, req).await?;
        Ok(reply(&body))
    }

    async fn save_soil(&self, req: &SoilSaveRequest) -> Result<ServerReply> {
        let body = self.post(endpoints::SOIL_SAVE, req).await?;
        Ok(reply(&body))
    }

    async fn save_soil_image(&self, req: &SoilImageSaveRequest) -> Result<ServerReply> {
        let body = self.post(endpoints::SOIL_IMAGE_SAVE, req).await?;
        Ok(reply(&body))
    }

    async fn list_images(&self, recent: bool) -> Result<Vec<ImageRecord>> {
        let path = if recent {
            endpoints::IMAGE_RECORDS_RECENT
        } else {
            endpoints::IMAGE_RECORDS
        };
        self.list(path).await
    }

    async fn list_soil(&self) -> Result<Vec<SoilRecord>> {
        self.list(endpoints::SOIL_RECORDS).await
    }

    async fn list_soil_images(&self) -> Result<Vec<SoilImageRecord>> {
        self.list(endpoints::SOIL_IMAGE_RECORDS).await
    }

    async fn delete_record(&self, kind: RecordKind, id: &str) -> Result<()> {
        let path = format!("{}/{}", endpoints::records_path(kind), id);
        self.delete(&path).await?;
        Ok(())
    }

    fn session_cookies(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .filter(|s| !s.is_empty())
    }

    fn restore_session(&self, cookies: &str) {
        for pair in cookies.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.jar.add_cookie_str(&format!("{}; Path=/", pair), &self.base);
        }
    }

    fn clear_session(&self) {
        let Some(current) = self.session_cookies() else {
            return;
        };
        for name in current.split(';').filter_map(|p| p.split('=').next()).map(str::trim) {
            if name.is_empty() {
                continue;
            }
            // an already-expired cookie evicts the stored one
            self.jar
                .add_cookie_str(&format!("{}=; Path=/; Max-Age=0", name), &self.base);
        }
        if self.session_cookies().is_some() {
            warn!("session cookies survived logout");
        }
    }
}
