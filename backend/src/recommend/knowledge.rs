//! Static treatment guidance used as grounding context for the language model.

use std::str::FromStr;

use cropguard_shared::DiseaseClass;

pub const NO_TREATMENT_DATA: &str =
    "No verified treatment data available. Please consult a local agricultural officer.";

pub fn treatment_document(disease: DiseaseClass) -> &'static str {
    use DiseaseClass::*;

    match disease {
        AppleBlackRot => {
            "Treatment: Apply fungicides such as Captan or Thiophanate-methyl at bloom and petal-fall. Cultural: Remove mummified fruits and prune dead wood. Ensure good air circulation."
        }
        AppleScab => {
            "Treatment: Use Mancozeb or Captan fungicide at early leaf emergence. Cultural: Remove fallen leaves and avoid overhead watering. Use resistant varieties when possible."
        }
        AppleCedarAppleRust => {
            "Treatment: Apply Myclobutanil or Propiconazole at early leaf stage. Cultural: Remove nearby juniper trees that host rust spores."
        }
        AppleHealthy => {
            "Cultural: Maintain balanced fertilization, prune regularly, and spray neem oil every 2 weeks as preventive pest control."
        }
        BananaPanama => {
            "CURE IS NONE. This is Fusarium wilt. Cultural: Destroy infected plants and avoid replanting bananas in the same soil for 5 years. Use resistant varieties like 'Gros Michel'."
        }
        BananaFusariumWilt => {
            "CURE IS NONE. Remove infected plants, sterilize soil with lime, and improve drainage. Use resistant cultivars such as 'Cavendish'."
        }
        BananaSigatoka => {
            "Treatment: Spray Mancozeb or Propiconazole weekly during infection period. Cultural: Prune lower leaves and increase airflow between plants."
        }
        BananaHealthy => {
            "Cultural: Maintain spacing, good drainage, and regular potassium fertilization. Apply Trichoderma-based biocontrol for root health."
        }
        CauliflowerBlackRot => {
            "Treatment: No chemical cure once infected. Prevent by using hot-water-treated seeds. Cultural: Avoid overhead watering and rotate crops every 3 years."
        }
        CauliflowerBacterialSpotRot => {
            "Treatment: Copper oxychloride or Streptocycline spray at early spotting. Cultural: Use clean seed and maintain field hygiene."
        }
        CauliflowerDownyMildew => {
            "Treatment: Apply Metalaxyl or Mancozeb at first symptom. Cultural: Maintain low humidity and ensure good spacing."
        }
        CauliflowerHealthy => {
            "Cultural: Maintain 6.5 pH soil, adequate nitrogen, and consistent watering. Use neem-based sprays preventively."
        }
        CornCercosporaLeafSpot => {
            "Treatment: Apply Mancozeb or Azoxystrobin. Cultural: Rotate with legumes and use resistant maize hybrids."
        }
        CornNorthernLeafBlight => {
            "Treatment: Use Propiconazole or Mancozeb spray. Cultural: Avoid monocropping and ensure residue management."
        }
        CornCommonRust => {
            "Treatment: Apply Triazole fungicides at first pustule appearance. Cultural: Grow rust-resistant hybrids and irrigate properly."
        }
        CornHealthy => {
            "Cultural: Use disease-free certified seeds, balanced fertilization, and pest monitoring weekly."
        }
        GrapeBlackRot => {
            "Treatment: Use Captan or Myclobutanil spray at pre-bloom and post-bloom. Cultural: Prune infected vines and avoid leaf wetness."
        }
        GrapeEsca => {
            "No chemical cure. Cultural: Prune infected vines below affected area, disinfect tools, and apply Trichoderma biofungicide to wounds."
        }
        GrapeLeafBlight => {
            "Treatment: Spray Mancozeb or Copper oxychloride. Cultural: Avoid excessive nitrogen and remove infected leaves."
        }
        GrapeHealthy => {
            "Cultural: Maintain canopy airflow, proper irrigation, and apply sulfur or neem oil preventively."
        }
        MangoGallMidge => {
            "Treatment: Spray Imidacloprid or Lambda-cyhalothrin at flowering. Cultural: Remove inflorescences showing galls. Plow under fallen debris."
        }
        MangoAnthracnose => {
            "Treatment: Apply Carbendazim or Copper oxychloride during flowering and fruit set. Cultural: Prune dense canopies and ensure air circulation."
        }
        MangoPowderyMildew => {
            "Treatment: Apply wettable sulfur or Triazole fungicides early. Cultural: Remove infected inflorescences and avoid overhead irrigation."
        }
        MangoHealthy => {
            "Cultural: Apply balanced fertilizer, prune after harvest, and use organic compost and neem sprays monthly."
        }
        PotatoEarlyBlight => {
            "Treatment: Mancozeb or Azoxystrobin every 10 days. Cultural: Avoid overhead watering and rotate with cereals."
        }
        PotatoLateBlight => {
            "Treatment: Metalaxyl + Mancozeb alternately. Cultural: Destroy infected foliage immediately and avoid waterlogging."
        }
        PotatoHealthy => {
            "Cultural: Use certified seed potatoes, maintain spacing, and apply neem oil weekly as preventive measure."
        }
        TomatoBacterialSpot => {
            "Treatment: Copper hydroxide spray. Cultural: Avoid working in wet fields, disinfect tools, and rotate crops yearly."
        }
        TomatoSpiderMites => {
            "Treatment: Use Abamectin or neem oil spray. Cultural: Increase humidity slightly and remove heavily infested leaves."
        }
        TomatoEarlyBlight => {
            "Treatment: Chlorothalonil or Mancozeb every 7 days. Cultural: Remove old leaves and mulch to prevent soil splash."
        }
        TomatoHealthy => {
            "Cultural: Use disease-free seedlings, balanced nutrients, and apply neem oil fortnightly as preventive care."
        }
    }
}

pub fn severity_note(severity: u8) -> &'static str {
    match severity {
        1 | 2 => "The infection is mild. Focus on sanitation and organic treatments.",
        3 | 4 => {
            "The infection is moderate. Begin recommended fungicide or insecticide treatments immediately."
        }
        5 => "The infection is severe. Immediate professional help and lab diagnosis are required.",
        _ => "Invalid severity level (should be 1–5).",
    }
}

/// Grounding context for a label that may come straight from a client, so
/// unknown names fall back to a generic referral.
pub fn treatment_context(disease_name: &str, severity: u8) -> String {
    let document = DiseaseClass::from_str(disease_name)
        .map(treatment_document)
        .unwrap_or(NO_TREATMENT_DATA);

    format!(
        "Disease: {}. Severity: {}/5. Details: {} Additional Instructions: {}",
        disease_name,
        severity,
        document,
        severity_note(severity)
    )
}
