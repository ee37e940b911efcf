use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use tracing::info;

use leafcare_types::api::UploadResponse;

use crate::error::ApiError;
use crate::extract::MultipartForm;
use crate::session::Session;
use crate::state::AppState;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// One file part pulled out of a multipart form.
pub struct FormFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormFile {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
    }
}

/// Parsed multipart form: the first file part plus any text fields.
#[derive(Default)]
pub struct Form {
    pub file: Option<FormFile>,
    pub fields: Vec<(String, String)>,
}

impl Form {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File size exceeds 10MB limit".into())
    } else {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Reads the whole form. Parts named in `file_fields` are taken as the file;
/// everything else is read as text.
pub async fn read_form(mut multipart: Multipart, file_fields: &[&str]) -> Result<Form, ApiError> {
    let mut form = Form::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if file_fields.contains(&name.as_str()) && form.file.is_none() {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(multipart_error)?;
            if data.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::PayloadTooLarge("File size exceeds 10MB limit".into()));
            }
            form.file = Some(FormFile {
                file_name,
                content_type,
                data: data.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.push((name, value));
        }
    }

    Ok(form)
}

/// POST /api/upload-image
pub async fn upload_image(
    State(state): State<AppState>,
    session: Session,
    MultipartForm(multipart): MultipartForm,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_form(multipart, &["file", "image"]).await?;

    let file = form
        .file
        .filter(|f| !f.data.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;
    if !file.is_image() {
        return Err(ApiError::BadRequest("File must be an image".into()));
    }

    let stored = state.storage.put(&file.file_name, &file.data).await?;
    info!("User {} uploaded {}", session.0.username, stored.key);

    Ok(Json(UploadResponse {
        success: true,
        image_url: stored.url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(ct: Option<&str>) -> FormFile {
        FormFile {
            file_name: "x".into(),
            content_type: ct.map(str::to_string),
            data: vec![1],
        }
    }

    #[test]
    fn image_content_types() {
        assert!(file(Some("image/png")).is_image());
        assert!(file(Some("Image/JPEG")).is_image());
        assert!(!file(Some("application/pdf")).is_image());
        assert!(!file(None).is_image());
    }

    #[test]
    fn blank_text_fields_read_as_missing() {
        let form = Form {
            file: None,
            fields: vec![("crop".into(), " Tomato ".into()), ("note".into(), "  ".into())],
        };
        assert_eq!(form.text("crop"), Some("Tomato"));
        assert_eq!(form.text("note"), None);
        assert_eq!(form.text("absent"), None);
    }
}
