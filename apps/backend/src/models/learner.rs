use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CEFR proficiency level, quantized from a latent ability estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    /// θ anchor for each level, per the mapping table in the data model.
    pub fn theta(self) -> f64 {
        match self {
            CefrLevel::A1 => -2.0,
            CefrLevel::A2 => -1.0,
            CefrLevel::B1 => 0.0,
            CefrLevel::B2 => 1.0,
            CefrLevel::C1 => 2.0,
            CefrLevel::C2 => 3.0,
        }
    }

    /// All levels in ascending θ order.
    pub fn all() -> [CefrLevel; 6] {
        [
            CefrLevel::A1,
            CefrLevel::A2,
            CefrLevel::B1,
            CefrLevel::B2,
            CefrLevel::C1,
            CefrLevel::C2,
        ]
    }

    /// Nearest CEFR level to a given θ. Ties go to the lower level.
    pub fn from_theta(theta: f64) -> CefrLevel {
        let mut best = CefrLevel::B1;
        let mut best_distance = f64::INFINITY;
        for level in CefrLevel::all() {
            let distance = (theta - level.theta()).abs();
            if distance < best_distance {
                best_distance = distance;
                best = level;
            }
        }
        best
    }
}

impl From<String> for CefrLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "A1" | "a1" => CefrLevel::A1,
            "A2" | "a2" => CefrLevel::A2,
            "B1" | "b1" => CefrLevel::B1,
            "B2" | "b2" => CefrLevel::B2,
            "C1" | "c1" => CefrLevel::C1,
            "C2" | "c2" => CefrLevel::C2,
            _ => CefrLevel::B1,
        }
    }
}

impl From<CefrLevel> for String {
    fn from(value: CefrLevel) -> Self {
        match value {
            CefrLevel::A1 => "A1".to_string(),
            CefrLevel::A2 => "A2".to_string(),
            CefrLevel::B1 => "B1".to_string(),
            CefrLevel::B2 => "B2".to_string(),
            CefrLevel::C1 => "C1".to_string(),
            CefrLevel::C2 => "C2".to_string(),
        }
    }
}

/// A learner's profile. Created lazily with defaults on first contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub user_key: String,
    pub cefr: CefrLevel,
    pub theta: f64,
    pub last_placement_ts: Option<DateTime<Utc>>,
}

impl Learner {
    pub fn default_for(user_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            cefr: CefrLevel::B1,
            theta: 0.0,
            last_placement_ts: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theta_quantizes_to_nearest_level() {
        assert_eq!(CefrLevel::from_theta(0.0), CefrLevel::B1);
        assert_eq!(CefrLevel::from_theta(1.4), CefrLevel::B2);
        assert_eq!(CefrLevel::from_theta(-2.6), CefrLevel::A1);
    }

    #[test]
    fn ties_go_to_the_lower_level() {
        // Midpoint between B1 (0.0) and B2 (1.0) is 0.5.
        assert_eq!(CefrLevel::from_theta(0.5), CefrLevel::B1);
        // Midpoint between A1 (-2.0) and A2 (-1.0) is -1.5.
        assert_eq!(CefrLevel::from_theta(-1.5), CefrLevel::A1);
    }
}
