use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocket::form::{self, Form};
use rocket::fs::{NamedFile, TempFile};
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{catch, get, post, FromForm, Request, State};
use tokio::io::AsyncReadExt;

use crate::config;
use crate::error::{AppError, Result};
use crate::models::UploadRecord;
use crate::services::UploadRelay;
use crate::store::{LocalObjectStorage, ObjectUpload};

#[derive(FromForm)]
pub struct UploadForm<'r> {
    pub file: form::Result<'r, TempFile<'r>>,
    pub folder: Option<String>,
}

#[get("/api/health")]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "server_time": chrono::Utc::now().to_rfc3339(),
    }))
}

#[post("/upload", data = "<form>")]
pub async fn upload(
    form: Form<UploadForm<'_>>,
    relay: &State<UploadRelay>,
) -> Result<status::Created<Json<UploadRecord>>> {
    let form = form.into_inner();
    // An oversized file part surfaces here as a field error, not a missing field
    let file = match form.file {
        Ok(file) => file,
        Err(errors) if errors.status() == Status::PayloadTooLarge => return Err(AppError::PayloadTooLarge),
        Err(_) => return Err(AppError::MissingFile),
    };
    if file.len() == 0 {
        return Err(AppError::MissingFile);
    }

    let upload = ObjectUpload {
        file_name: file_name(&file),
        content_type: file.content_type().map(|ct| ct.to_string()),
        folder: form.folder.unwrap_or_else(|| config::DEFAULT_UPLOAD_FOLDER.to_string()),
        data: read_temp_file(&file).await?.into(),
    };

    let record = relay.relay(upload).await?;
    let location = format!("/uploads/{}", record.id);
    Ok(status::Created::new(location).body(Json(record)))
}

fn file_name(file: &TempFile<'_>) -> String {
    let raw = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_default();

    // Keep only the last path segment of whatever the client sent
    Path::new(&raw.replace('\\', "/"))
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .or_else(|| file.name().map(str::to_string))
        .unwrap_or_else(|| "upload".to_string())
}

async fn read_temp_file(file: &TempFile<'_>) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await?;
    tokio::pin!(reader);
    reader.read_to_end(&mut data).await?;
    Ok(data)
}

#[get("/uploads")]
pub async fn list_uploads(relay: &State<UploadRelay>) -> Result<Json<Vec<UploadRecord>>> {
    Ok(Json(relay.list().await?))
}

#[get("/uploads/<id>")]
pub async fn get_upload(id: &str, relay: &State<UploadRelay>) -> Result<Json<UploadRecord>> {
    Ok(Json(relay.get(id).await?))
}

#[get("/media/<path..>")]
pub async fn media(path: PathBuf, storage: &State<Arc<LocalObjectStorage>>) -> Option<NamedFile> {
    let public_id = path.to_string_lossy().replace('\\', "/");
    let file = storage.resolve(&public_id)?;
    NamedFile::open(file).await.ok()
}

fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

// Error catchers
#[catch(400)]
pub fn bad_request() -> Json<serde_json::Value> {
    error_body("Bad request")
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<serde_json::Value> {
    error_body(&format!("Nothing at {}", req.uri()))
}

#[catch(413)]
pub fn payload_too_large() -> Json<serde_json::Value> {
    error_body(&AppError::PayloadTooLarge.to_string())
}

#[catch(422)]
pub fn unprocessable() -> Json<serde_json::Value> {
    error_body("Malformed upload form")
}

#[catch(500)]
pub fn server_error() -> Json<serde_json::Value> {
    error_body("Internal server error")
}
