//! Domain types
//!
//! Shared between the workflows and the terminal front-end:
//! - PredictionResult: normalized leaf prediction
//! - Crop / SoilColor: enumerated soil-form choices (wire names kept verbatim)
//! - CarriedLeafContext: values handed from the leaf flow to the soil flow
//! - User / Role: account data

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized leaf prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub top_label: String,
    pub confidence: Option<f64>,
    pub care_text: Option<String>,
    pub medicine_text: Option<String>,
    /// Treatment string exactly as the server sent it
    pub raw_treatment_text: Option<String>,
}

impl PredictionResult {
    /// Confidence as an integer percent (`0.87` → 87)
    pub fn confidence_percent(&self) -> Option<u32> {
        self.confidence.map(confidence_to_percent)
    }

    /// `care | medicine`, falling back to the raw treatment text
    pub fn treatment_summary(&self) -> Option<String> {
        let joined = [self.care_text.as_deref(), self.medicine_text.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");

        if !joined.is_empty() {
            return Some(joined);
        }
        self.raw_treatment_text
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .cloned()
    }

    /// Context for continuing into the soil form
    pub fn to_carried_context(&self, image_path: &str) -> CarriedLeafContext {
        CarriedLeafContext {
            disease: Some(self.top_label.clone()),
            confidence: self.confidence.map(|c| c.to_string()),
            image: Some(image_path.to_string()).filter(|p| !p.is_empty()),
            care: self.care_text.clone(),
            medicine: self.medicine_text.clone(),
        }
    }
}

/// Scores at or below 1.0 are fractions; anything above is already a percent.
pub fn confidence_to_percent(confidence: f64) -> u32 {
    let pct = if confidence <= 1.0 { confidence * 100.0 } else { confidence };
    pct.round().clamp(0.0, 100.0) as u32
}

/// Values carried from the leaf prediction into the soil form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarriedLeafContext {
    pub disease: Option<String>,
    pub confidence: Option<String>,
    pub image: Option<String>,
    pub care: Option<String>,
    pub medicine: Option<String>,
}

impl CarriedLeafContext {
    /// True when no field carries a non-empty value
    pub fn is_empty(&self) -> bool {
        [
            &self.disease,
            &self.confidence,
            &self.image,
            &self.care,
            &self.medicine,
        ]
        .iter()
        .all(|v| v.as_deref().map_or(true, str::is_empty))
    }
}

/// Crops the fertilizer model knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crop {
    Apple,
    #[serde(rename = "Corn_(maize)")]
    Corn,
    Grape,
    Mango,
    Orange,
    #[serde(rename = "Pepper__bell")]
    PepperBell,
    Potato,
    Rice,
    Tomato,
}

impl Crop {
    pub const ALL: [Crop; 9] = [
        Crop::Apple,
        Crop::Corn,
        Crop::Grape,
        Crop::Mango,
        Crop::Orange,
        Crop::PepperBell,
        Crop::Potato,
        Crop::Rice,
        Crop::Tomato,
    ];

    /// Name used on the wire and as the i18n key
    pub fn wire_name(&self) -> &'static str {
        match self {
            Crop::Apple => "Apple",
            Crop::Corn => "Corn_(maize)",
            Crop::Grape => "Grape",
            Crop::Mango => "Mango",
            Crop::Orange => "Orange",
            Crop::PepperBell => "Pepper__bell",
            Crop::Potato => "Potato",
            Crop::Rice => "Rice",
            Crop::Tomato => "Tomato",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Crop {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Crop::ALL
            .iter()
            .copied()
            .find(|c| c.wire_name().eq_ignore_ascii_case(needle))
            .or_else(|| match needle.to_lowercase().as_str() {
                "corn" | "maize" => Some(Crop::Corn),
                "pepper" | "pepper_bell" | "bell pepper" => Some(Crop::PepperBell),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown crop: {}", s))
    }
}

/// Soil colors offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoilColor {
    Black,
    Red,
    #[serde(rename = "Dark Brown")]
    DarkBrown,
    #[serde(rename = "Reddish Brown")]
    ReddishBrown,
}

impl SoilColor {
    pub const ALL: [SoilColor; 4] = [
        SoilColor::Black,
        SoilColor::Red,
        SoilColor::DarkBrown,
        SoilColor::ReddishBrown,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            SoilColor::Black => "Black",
            SoilColor::Red => "Red",
            SoilColor::DarkBrown => "Dark Brown",
            SoilColor::ReddishBrown => "Reddish Brown",
        }
    }
}

impl fmt::Display for SoilColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for SoilColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(['_', '-'], " ").to_lowercase();
        SoilColor::ALL
            .iter()
            .copied()
            .find(|c| c.wire_name().to_lowercase() == normalized)
            .ok_or_else(|| format!("Unknown soil color: {}", s))
    }
}

/// Account role chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Doctor,
    Farmer,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "farmer" => Ok(Role::Farmer),
            _ => Err(format!("Unknown role: {}. Use doctor or farmer", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Doctor => write!(f, "Doctor"),
            Role::Farmer => write!(f, "Farmer"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Signed-in user profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub address: Option<Address>,
}

impl User {
    /// Up to two initials from the user's name
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_percent() {
        assert_eq!(confidence_to_percent(0.87), 87);
        assert_eq!(confidence_to_percent(0.874), 87);
        assert_eq!(confidence_to_percent(1.0), 100);
        assert_eq!(confidence_to_percent(92.4), 92);
    }

    #[test]
    fn test_treatment_summary() {
        let result = PredictionResult {
            top_label: "Tomato___blight".into(),
            care_text: Some("Remove affected leaves".into()),
            medicine_text: Some("Copper spray".into()),
            ..Default::default()
        };
        assert_eq!(
            result.treatment_summary().as_deref(),
            Some("Remove affected leaves | Copper spray")
        );

        let raw_only = PredictionResult {
            top_label: "x".into(),
            raw_treatment_text: Some("keep dry".into()),
            ..Default::default()
        };
        assert_eq!(raw_only.treatment_summary().as_deref(), Some("keep dry"));
    }

    #[test]
    fn test_carried_context_from_prediction() {
        let result = PredictionResult {
            top_label: "Rice___brown_spot".into(),
            confidence: Some(0.5),
            ..Default::default()
        };
        let ctx = result.to_carried_context("uploads/a.jpg");
        assert_eq!(ctx.disease.as_deref(), Some("Rice___brown_spot"));
        assert_eq!(ctx.confidence.as_deref(), Some("0.5"));
        assert_eq!(ctx.image.as_deref(), Some("uploads/a.jpg"));
        assert!(!ctx.is_empty());
        assert!(CarriedLeafContext::default().is_empty());
    }

    #[test]
    fn test_crop_parse_and_wire_names() {
        assert_eq!("rice".parse::<Crop>().unwrap(), Crop::Rice);
        assert_eq!("Corn_(maize)".parse::<Crop>().unwrap(), Crop::Corn);
        assert_eq!("maize".parse::<Crop>().unwrap(), Crop::Corn);
        assert_eq!(Crop::PepperBell.to_string(), "Pepper__bell");
        assert_eq!(serde_json::to_string(&Crop::Corn).unwrap(), "\"Corn_(maize)\"");
        assert!("banana".parse::<Crop>().is_err());
    }

    #[test]
    fn test_soil_color_parse() {
        assert_eq!("dark brown".parse::<SoilColor>().unwrap(), SoilColor::DarkBrown);
        assert_eq!("Reddish_Brown".parse::<SoilColor>().unwrap(), SoilColor::ReddishBrown);
        assert_eq!(serde_json::to_string(&SoilColor::DarkBrown).unwrap(), "\"Dark Brown\"");
    }

    #[test]
    fn test_user_initials_and_mongo_id() {
        let user: User = serde_json::from_str(
            r#"{"_id": "u1", "name": "Rahim Uddin Khan", "email": "r@example.com", "role": "Farmer"}"#,
        )
        .unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.initials(), "RU");
        assert!(user.phone.is_none());
    }
}
