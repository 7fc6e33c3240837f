//! Turns raw request bodies into validated inputs.

use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::http::header::CONTENT_LENGTH;
use actix_web::{HttpRequest, web};
use cropguard_shared::{DEFAULT_LANGUAGE, RecommendationRequest};
use futures::TryStreamExt;
use serde_json::Value;

use crate::error::ApiError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Whole-request ceiling for uploads: the image plus room for the other
/// form fields and multipart framing.
pub const MAX_UPLOAD_REQUEST_BYTES: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Ceiling for the JSON body of `/api/recommend`.
pub const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const ALLOWED_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];
const MAX_TEXT_FIELD_BYTES: usize = 64;

const NO_IMAGE: &str = "No image file provided";
const BAD_EXTENSION: &str = "File must be JPG or PNG format";
const TOO_LARGE: &str = "File size must be under 10MB";
const BAD_MIME: &str = "File must be a valid JPG or PNG image";

#[derive(Debug, Default)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    /// Bytes received, including any beyond the limit that were discarded.
    pub size: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<ImageUpload>,
    pub language_code: Option<String>,
}

#[derive(Debug)]
pub struct ValidatedUpload {
    pub image: Vec<u8>,
    pub language_code: String,
}

impl UploadForm {
    pub async fn read(req: &HttpRequest, mut payload: Multipart) -> Result<Self, ApiError> {
        let declared_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        if declared_length.is_some_and(|length| length > MAX_UPLOAD_REQUEST_BYTES) {
            return Err(ApiError::PayloadTooLarge);
        }

        let mut form = UploadForm::default();
        while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
            let name = field
                .content_disposition()
                .and_then(|disposition| disposition.get_name())
                .unwrap_or_default()
                .to_string();

            match name.as_str() {
                "image" if form.image.is_none() => {
                    form.image = Some(read_image(&mut field).await?);
                }
                "language_code" => {
                    form.language_code = read_text(&mut field).await?;
                }
                _ => drain(&mut field).await?,
            }
        }
        Ok(form)
    }

    pub fn into_validated(self) -> Result<ValidatedUpload, ApiError> {
        let image = self.image.ok_or_else(|| ApiError::validation(NO_IMAGE))?;
        validate_image(&image)?;
        Ok(ValidatedUpload {
            image: image.bytes,
            language_code: self
                .language_code
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        })
    }
}

/// Checks, in order: presence, extension, size, declared content type.
pub fn validate_image(upload: &ImageUpload) -> Result<(), ApiError> {
    if upload.filename.is_empty() {
        return Err(ApiError::validation(NO_IMAGE));
    }

    let extension = upload
        .filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase());
    if !extension.is_some_and(|extension| ALLOWED_EXTENSIONS.contains(&extension.as_str())) {
        return Err(ApiError::validation(BAD_EXTENSION));
    }

    if upload.size > MAX_IMAGE_BYTES {
        return Err(ApiError::validation(TOO_LARGE));
    }

    let mime_allowed = upload
        .content_type
        .as_deref()
        .is_some_and(|mime| ALLOWED_MIME_TYPES.contains(&mime));
    if !mime_allowed {
        return Err(ApiError::validation(BAD_MIME));
    }
    Ok(())
}

/// Collects a JSON request body, refusing it once it grows past
/// [`MAX_JSON_BODY_BYTES`].
pub async fn read_json_body(mut payload: web::Payload) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.try_next().await.map_err(|e| {
        log::debug!("Unreadable request body: {}", e);
        ApiError::validation("No JSON data provided")
    })? {
        if body.len() + chunk.len() > MAX_JSON_BODY_BYTES {
            return Err(ApiError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Parses the `/api/recommend` body, accepting severities sent as integers,
/// floats (truncated) or numeric strings.
pub fn recommendation_request(body: &[u8]) -> Result<RecommendationRequest, ApiError> {
    let data = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(ApiError::validation("No JSON data provided")),
    };

    let disease_name = data
        .get("disease_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty());
    let severity = data.get("severity_level").filter(|value| !value.is_null());
    let (Some(disease_name), Some(severity)) = (disease_name, severity) else {
        return Err(ApiError::validation(
            "Missing required fields: disease_name, severity_level",
        ));
    };

    let severity = severity_from_json(severity)
        .ok_or_else(|| ApiError::validation("Severity level must be an integer"))?;
    if !(1..=5).contains(&severity) {
        return Err(ApiError::validation("Severity level must be between 1 and 5"));
    }

    let language_code = data
        .get("language_code")
        .and_then(Value::as_str)
        .filter(|code| !code.trim().is_empty())
        .unwrap_or(DEFAULT_LANGUAGE);

    Ok(RecommendationRequest {
        disease_name: disease_name.to_string(),
        severity_level: severity as u8,
        language_code: language_code.trim().to_string(),
    })
}

fn severity_from_json(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite())
                .map(|value| value.trunc() as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

async fn read_image(field: &mut Field) -> Result<ImageUpload, ApiError> {
    let filename = field
        .content_disposition()
        .and_then(|disposition| disposition.get_filename())
        .unwrap_or_default()
        .to_string();
    let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

    let mut upload = ImageUpload {
        filename,
        content_type,
        ..ImageUpload::default()
    };
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        upload.size += chunk.len();
        if upload.size <= MAX_IMAGE_BYTES {
            upload.bytes.extend_from_slice(&chunk);
        } else if !upload.bytes.is_empty() {
            upload.bytes = Vec::new();
        }
    }
    Ok(upload)
}

async fn read_text(field: &mut Field) -> Result<Option<String>, ApiError> {
    let mut raw = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        let room = MAX_TEXT_FIELD_BYTES.saturating_sub(raw.len());
        raw.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    let text = String::from_utf8_lossy(&raw).trim().to_string();
    Ok((!text.is_empty()).then_some(text))
}

async fn drain(field: &mut Field) -> Result<(), ApiError> {
    while field.try_next().await.map_err(malformed)?.is_some() {}
    Ok(())
}

fn malformed(e: MultipartError) -> ApiError {
    log::debug!("Unreadable multipart payload: {}", e);
    ApiError::validation(NO_IMAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, content_type: Option<&str>, size: usize) -> ImageUpload {
        ImageUpload {
            filename: filename.to_string(),
            content_type: content_type.map(str::to_string),
            size,
            bytes: Vec::new(),
        }
    }

    fn rejection(result: Result<(), ApiError>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn accepts_common_photo_uploads() {
        assert!(validate_image(&upload("leaf.JPG", Some("image/jpeg"), 1024)).is_ok());
        assert!(validate_image(&upload("leaf.photo.png", Some("image/png"), MAX_IMAGE_BYTES)).is_ok());
    }

    #[test]
    fn rejections_name_the_cause_in_order() {
        assert_eq!(rejection(validate_image(&upload("", None, 0))), NO_IMAGE);
        assert_eq!(
            rejection(validate_image(&upload("leaf.gif", Some("image/gif"), 1))),
            BAD_EXTENSION
        );
        assert_eq!(
            rejection(validate_image(&upload("leaf", Some("image/png"), 1))),
            BAD_EXTENSION
        );
        assert_eq!(
            rejection(validate_image(&upload("leaf.png", Some("text/plain"), MAX_IMAGE_BYTES + 1))),
            TOO_LARGE
        );
        assert_eq!(
            rejection(validate_image(&upload("leaf.png", Some("application/octet-stream"), 10))),
            BAD_MIME
        );
        assert_eq!(rejection(validate_image(&upload("leaf.png", None, 10))), BAD_MIME);
    }

    #[test]
    fn missing_image_field_is_rejected() {
        let err = UploadForm::default().into_validated().unwrap_err();
        assert_eq!(err.to_string(), NO_IMAGE);
    }

    #[test]
    fn language_defaults_to_english() {
        let form = UploadForm {
            image: Some(ImageUpload {
                bytes: vec![1, 2, 3],
                ..upload("a.png", Some("image/png"), 3)
            }),
            language_code: None,
        };
        let validated = form.into_validated().unwrap();
        assert_eq!(validated.language_code, "en");
        assert_eq!(validated.image, vec![1, 2, 3]);
    }

    #[test]
    fn recommendation_body_parsing() {
        let request =
            recommendation_request(br#"{"disease_name":"Apple_scab","severity_level":"3"}"#).unwrap();
        assert_eq!(request.severity_level, 3);
        assert_eq!(request.language_code, "en");

        let request = recommendation_request(
            br#"{"disease_name":"Apple_scab","severity_level":4.9,"language_code":"hi"}"#,
        )
        .unwrap();
        assert_eq!(request.severity_level, 4);
        assert_eq!(request.language_code, "hi");
    }

    #[test]
    fn recommendation_body_rejections() {
        let message = |body: &[u8]| recommendation_request(body).unwrap_err().to_string();

        assert_eq!(message(b""), "No JSON data provided");
        assert_eq!(message(b"{}"), "No JSON data provided");
        assert_eq!(message(b"[1,2]"), "No JSON data provided");
        assert_eq!(
            message(br#"{"disease_name":"Apple_scab"}"#),
            "Missing required fields: disease_name, severity_level"
        );
        assert_eq!(
            message(br#"{"disease_name":"","severity_level":2}"#),
            "Missing required fields: disease_name, severity_level"
        );
        assert_eq!(
            message(br#"{"disease_name":"Apple_scab","severity_level":"high"}"#),
            "Severity level must be an integer"
        );
        assert_eq!(
            message(br#"{"disease_name":"Apple_scab","severity_level":6}"#),
            "Severity level must be between 1 and 5"
        );
        assert_eq!(
            message(br#"{"disease_name":"Apple_scab","severity_level":0}"#),
            "Severity level must be between 1 and 5"
        );
    }
}
