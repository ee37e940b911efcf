use axum::{Json, extract::State};
use reqwest::{
    Client,
    multipart::{Form as HttpForm, Part},
};
use tracing::{debug, error, info};

use leafcare_types::api::{Detection, DetectionResponse};

use crate::error::ApiError;
use crate::extract::MultipartForm;
use crate::state::AppState;
use crate::uploads::{FormFile, read_form};

pub const STUB_CATEGORY: &str = "Black Rot";

/// Plant disease classifier. Without a configured endpoint every image is
/// reported as the stub category with full confidence.
pub struct Classifier {
    http: Client,
    url: Option<String>,
}

impl Classifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub async fn classify(&self, image: FormFile, crop: &str) -> Result<Detection, ApiError> {
        let Some(url) = &self.url else {
            debug!("No classifier configured, returning stub for {}", crop);
            return Ok(Detection {
                category: STUB_CATEGORY.to_string(),
                confidence: 1.0,
            });
        };

        let mut part = Part::bytes(image.data).file_name(image.file_name);
        if let Some(ct) = image.content_type.as_deref() {
            part = part
                .mime_str(ct)
                .map_err(|_| ApiError::BadRequest(format!("Unsupported content type '{}'", ct)))?;
        }
        let form = HttpForm::new().part("image", part).text("model", crop.to_string());

        let response = self.http.post(url).multipart(form).send().await.map_err(|e| {
            error!(error = ?e, "Classifier request failed");
            ApiError::Upstream("Failed to detect disease".into())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(status = %status, "Classifier returned error");
            return Err(ApiError::Upstream(format!("Classifier returned {}", status.as_u16())));
        }

        response.json::<Detection>().await.map_err(|e| {
            error!(error = ?e, "Malformed classifier response");
            ApiError::Upstream("Failed to detect disease".into())
        })
    }
}

/// POST /api/detect-disease
pub async fn detect_disease(
    State(state): State<AppState>,
    MultipartForm(multipart): MultipartForm,
) -> Result<Json<DetectionResponse>, ApiError> {
    let form = read_form(multipart, &["file"]).await?;

    let crop = form.text("crop").map(str::to_string);
    let (Some(file), Some(crop)) = (form.file.filter(|f| !f.data.is_empty()), crop) else {
        return Err(ApiError::BadRequest("File and crop are required".into()));
    };

    let detection = state.classifier.classify(file, &crop).await?;
    info!("Detected {} ({:.2}) on {}", detection.category, detection.confidence, crop);

    Ok(Json(DetectionResponse {
        success: true,
        category: detection.category,
        confidence: detection.confidence,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{Router, extract::Multipart as MockForm, routing::post};
    use serde_json::{Value, json};

    use super::*;

    fn leaf() -> FormFile {
        FormFile {
            file_name: "leaf.png".into(),
            content_type: Some("image/png".into()),
            data: b"png".to_vec(),
        }
    }

    #[tokio::test]
    async fn unconfigured_classifier_returns_stub() {
        let d = Classifier::new(None).classify(leaf(), "Apple").await.unwrap();
        assert_eq!(d.category, STUB_CATEGORY);
        assert_eq!(d.confidence, 1.0);
    }

    #[tokio::test]
    async fn forwards_image_and_model_to_classifier() {
        async fn classify(mut form: MockForm) -> Json<Value> {
            let mut seen = Vec::new();
            while let Some(field) = form.next_field().await.unwrap() {
                let name = field.name().unwrap().to_string();
                if name == "model" {
                    assert_eq!(field.text().await.unwrap(), "Tomato");
                } else {
                    assert_eq!(field.file_name(), Some("leaf.png"));
                }
                seen.push(name);
            }
            assert_eq!(seen, ["image", "model"]);
            Json(json!({ "category": "Early Blight", "confidence": 0.87 }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/classify", post(classify)))
                .await
                .unwrap();
        });

        let classifier = Classifier::new(Some(format!("http://{}/classify", addr)));
        let d = classifier.classify(leaf(), "Tomato").await.unwrap();
        assert_eq!(d.category, "Early Blight");
        assert!((d.confidence - 0.87).abs() < f64::EPSILON);
    }
}
