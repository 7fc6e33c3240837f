//! Severity ladder used by the farmer-facing reports.
//!
//! This is a business rule, not a calibrated estimate: the breakpoints below
//! are product decisions and are reproduced exactly for compatibility.
//!
//! | label    | confidence (%) | severity |
//! |----------|----------------|----------|
//! | healthy  | >= 95          | 1        |
//! | healthy  | < 95           | 2        |
//! | disease  | < 75           | 2        |
//! | disease  | < 85           | 3        |
//! | disease  | < 95           | 4        |
//! | disease  | >= 95          | 5        |

use cropguard_shared::DiseaseClass;

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 5;

pub fn severity_level(disease: DiseaseClass, confidence: f32) -> u8 {
    if disease.is_healthy() {
        return if confidence >= 95.0 { 1 } else { 2 };
    }

    if confidence < 75.0 {
        2
    } else if confidence < 85.0 {
        3
    } else if confidence < 95.0 {
        4
    } else {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_disease_is_severe() {
        assert_eq!(severity_level(DiseaseClass::PotatoLateBlight, 96.0), 5);
        assert_eq!(severity_level(DiseaseClass::PotatoLateBlight, 95.0), 5);
    }

    #[test]
    fn disease_breakpoints() {
        let disease = DiseaseClass::AppleScab;
        assert_eq!(severity_level(disease, 70.0), 2);
        assert_eq!(severity_level(disease, 74.99), 2);
        assert_eq!(severity_level(disease, 75.0), 3);
        assert_eq!(severity_level(disease, 84.99), 3);
        assert_eq!(severity_level(disease, 85.0), 4);
        assert_eq!(severity_level(disease, 94.99), 4);
    }

    #[test]
    fn healthy_labels_stay_low() {
        assert_eq!(severity_level(DiseaseClass::TomatoHealthy, 98.0), 1);
        assert_eq!(severity_level(DiseaseClass::TomatoHealthy, 60.0), 2);
        assert_eq!(severity_level(DiseaseClass::BananaHealthy, 100.0), 1);
    }

    #[test]
    fn always_within_bounds() {
        for confidence in [0.0, 12.5, 50.0, 75.0, 99.9, 100.0] {
            for disease in [DiseaseClass::MangoHealthy, DiseaseClass::GrapeEsca] {
                let level = severity_level(disease, confidence);
                assert!((MIN_SEVERITY..=MAX_SEVERITY).contains(&level));
            }
        }
    }
}
