use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

pub const DEFAULT_LANGUAGE: &str = "en";

/// Labels produced by the leaf classifier, in the order of the network's
/// output vector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, EnumCount, AsRefStr,
)]
pub enum DiseaseClass {
    #[strum(serialize = "Apple_Black_rot")]
    AppleBlackRot,
    #[strum(serialize = "Apple_scab")]
    AppleScab,
    #[strum(serialize = "Banana_Panama")]
    BananaPanama,
    #[strum(serialize = "Cauliflower_Black_Rot")]
    CauliflowerBlackRot,
    #[strum(serialize = "Corn_(maize)_Cercospora_leaf_spot")]
    CornCercosporaLeafSpot,
    #[strum(serialize = "Corn_(maize)_Northern_Leaf_Blight")]
    CornNorthernLeafBlight,
    #[strum(serialize = "Grape_healthy")]
    GrapeHealthy,
    #[strum(serialize = "Mango_Gall_Midge")]
    MangoGallMidge,
    #[strum(serialize = "Potato_Early_blight")]
    PotatoEarlyBlight,
    #[strum(serialize = "Tomato_Bacterial_spot")]
    TomatoBacterialSpot,
    #[strum(serialize = "Tomato_Two_spotted_Spider_mites")]
    TomatoSpiderMites,
    #[strum(serialize = "Apple_Cedar_apple_rust")]
    AppleCedarAppleRust,
    #[strum(serialize = "Banana_Fusarium_wilt")]
    BananaFusariumWilt,
    #[strum(serialize = "Banana_Sigatoka")]
    BananaSigatoka,
    #[strum(serialize = "Cauliflower_Downy_Mildew")]
    CauliflowerDownyMildew,
    #[strum(serialize = "Corn_(maize)_Common_rust")]
    CornCommonRust,
    #[strum(serialize = "Grape_Black_rot")]
    GrapeBlackRot,
    #[strum(serialize = "Grape_Leaf_blight_(Isariopsis_Leaf_Spot)")]
    GrapeLeafBlight,
    #[strum(serialize = "Mango_Healthy")]
    MangoHealthy,
    #[strum(serialize = "Potato_healthy")]
    PotatoHealthy,
    #[strum(serialize = "Tomato_Early_blight")]
    TomatoEarlyBlight,
    #[strum(serialize = "Apple_healthy")]
    AppleHealthy,
    #[strum(serialize = "Banana_Healthy")]
    BananaHealthy,
    #[strum(serialize = "Cauliflower_Bacterial_spot_rot")]
    CauliflowerBacterialSpotRot,
    #[strum(serialize = "Cauliflower_Healthy")]
    CauliflowerHealthy,
    #[strum(serialize = "Corn_(maize)_healthy")]
    CornHealthy,
    #[strum(serialize = "Grape_Esca_(Black_Measles)")]
    GrapeEsca,
    #[strum(serialize = "Mango_Anthracnose")]
    MangoAnthracnose,
    #[strum(serialize = "Mango_Powdery Mildew")]
    MangoPowderyMildew,
    #[strum(serialize = "Potato_Late_blight")]
    PotatoLateBlight,
    #[strum(serialize = "Tomato_healthy")]
    TomatoHealthy,
}

impl DiseaseClass {
    /// Maps a position in the classifier output to its label.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    /// Position in the classifier output.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_healthy(&self) -> bool {
        self.as_ref().to_ascii_lowercase().ends_with("healthy")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageQuality {
    Good,
    Blurry,
    Enhanced,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub disease_name: String,
    pub confidence: f32,
    pub severity_level: u8,
    pub gradcam_image: Option<String>,
    pub image_quality: ImageQuality,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecommendationRequest {
    pub disease_name: String,
    pub severity_level: u8,
    #[serde(default = "default_language")]
    pub language_code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Recommendation {
    pub disease_name: String,
    pub severity_level: u8,
    pub language_code: String,
    pub recommendation: String,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    pub prediction: Prediction,
    pub recommendation: Recommendation,
}

/// `{"success": true, ...}` envelope around an endpoint payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiSuccess<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiFailure {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
