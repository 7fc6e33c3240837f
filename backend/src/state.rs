use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::AnalysisPipeline;
use crate::recommend::{LlmError, RecommendationService};

/// Shared per-process state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub recommender: RecommendationService,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline, recommender: RecommendationService) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            recommender,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let pipeline = AnalysisPipeline::load(&config.models, &config.saliency);
        let recommender = RecommendationService::from_config(&config.llm)?;
        Ok(Self::new(pipeline, recommender))
    }
}
