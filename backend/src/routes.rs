use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{SecondsFormat, Utc};
use cropguard_shared::{AnalysisReport, ApiFailure, ApiSuccess, Recommendation};
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::{self, UploadForm};
use crate::pipeline::Analysis;
use crate::recommend::RecommendationService;
use crate::state::AppState;

#[derive(Serialize)]
struct Health<'a> {
    status: &'static str,
    classifier_loaded: bool,
    enhancer_loaded: bool,
    llm_provider: &'a str,
    llm_configured: bool,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/predict").route(web::post().to(predict)))
        .service(web::resource("/api/recommend").route(web::post().to(recommend)))
        .service(
            web::resource("/api/predict-and-recommend").route(web::post().to(predict_and_recommend)),
        )
        .service(web::resource("/api/health").route(web::get().to(health)));
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiFailure::new("Resource not found").with_status(404))
}

async fn predict(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = UploadForm::read(&req, payload).await?.into_validated()?;
    let analysis = analyze(&state, upload.image).await?;
    Ok(HttpResponse::Ok().json(ApiSuccess::new(analysis.to_prediction())))
}

async fn recommend(
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let body = extract::read_json_body(payload).await?;
    let request = extract::recommendation_request(&body)?;
    let recommendation = build_recommendation(
        &state.recommender,
        request.disease_name,
        request.severity_level,
        request.language_code,
    )
    .await;
    Ok(HttpResponse::Ok().json(ApiSuccess::new(recommendation)))
}

async fn predict_and_recommend(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = UploadForm::read(&req, payload).await?.into_validated()?;
    let analysis = analyze(&state, upload.image).await?;
    let prediction = analysis.to_prediction();

    let recommendation = build_recommendation(
        &state.recommender,
        prediction.disease_name.clone(),
        prediction.severity_level,
        upload.language_code,
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiSuccess::new(AnalysisReport {
        prediction,
        recommendation,
    })))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(Health {
        status: "healthy",
        classifier_loaded: state.pipeline.classifier_loaded(),
        enhancer_loaded: state.pipeline.enhancer_loaded(),
        llm_provider: state.recommender.provider(),
        llm_configured: state.recommender.is_configured(),
    })
}

/// Model inference is CPU/GPU bound, so it runs on the blocking pool.
async fn analyze(state: &AppState, image: Vec<u8>) -> Result<Analysis, ApiError> {
    let pipeline = state.pipeline.clone();
    web::block(move || pipeline.analyze(&image)).await?
}

async fn build_recommendation(
    recommender: &RecommendationService,
    disease_name: String,
    severity_level: u8,
    language_code: String,
) -> Recommendation {
    let recommendation = recommender
        .generate(&disease_name, severity_level, &language_code)
        .await;
    Recommendation {
        disease_name,
        severity_level,
        language_code,
        recommendation,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    }
}
