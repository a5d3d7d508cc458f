//! Maps a severity ratio onto one of twelve ordinal tiers and the fixed
//! treatment guidance for that tier.
//!
//! | Tier | Diseased share of leaf | Category |
//! |------|------------------------|----------|
//! | 0    | 0%                     | Healthy  |
//! | 1-3  | (0%, 12%]              | Mild     |
//! | 4-6  | (12%, 75%]             | Moderate |
//! | 7-11 | above 75%              | Severe   |

use serde::Serialize;
use strum::Display;

use crate::types::SeverityRatio;

/// Inclusive upper bounds (as ratios) of tiers 1 through 9.
/// Tier 10 covers everything below 1.0, tier 11 everything from 1.0 up.
const INCLUSIVE_UPPER_BOUNDS: [f64; 9] = [0.03, 0.06, 0.12, 0.25, 0.50, 0.75, 0.87, 0.94, 0.97];

const TIER_RANGES: [&str; 12] = [
    "0%",
    "(0%, 3%]",
    "(3%, 6%]",
    "(6%, 12%]",
    "(12%, 25%]",
    "(25%, 50%]",
    "(50%, 75%]",
    "(75%, 87%]",
    "(87%, 94%]",
    "(94%, 97%]",
    "(97%, 100%)",
    ">= 100%",
];

/// Ordinal severity bucket, `0..=11`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SeverityTier(u8);

impl SeverityTier {
    pub const HEALTHY: SeverityTier = SeverityTier(0);
    pub const MAX: SeverityTier = SeverityTier(11);
    pub const COUNT: usize = 12;

    /// Tier by index, `None` above [`SeverityTier::MAX`]
    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::MAX.0).then_some(Self(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    pub fn category(&self) -> TreatmentCategory {
        match self.0 {
            0 => TreatmentCategory::Healthy,
            1..=3 => TreatmentCategory::Mild,
            4..=6 => TreatmentCategory::Moderate,
            _ => TreatmentCategory::Severe,
        }
    }

    /// Human-readable percentage range covered by this tier
    pub fn range_label(&self) -> &'static str {
        TIER_RANGES[usize::from(self.0)]
    }

    pub fn all() -> impl Iterator<Item = SeverityTier> {
        (0..=Self::MAX.0).map(SeverityTier)
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broad treatment strategy shared by a band of tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentCategory {
    Healthy,
    /// Cultural and mechanical remediation
    Mild,
    /// Chemical and biological fungicides
    Moderate,
    /// Plant removal, fungicide rotation, sanitation
    Severe,
}

impl TreatmentCategory {
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Self::Healthy => &["No treatment necessary."],
            Self::Mild => &[
                "Remove and destroy infected lower leaves to prevent disease spread.",
                "Stake or cage plants to improve airflow and reduce humidity.",
                "Use drip irrigation or water at the base to keep foliage dry.",
            ],
            Self::Moderate => &[
                "Use fungicides containing chlorothalonil or copper-based products every 7-10 days.",
                "Apply bio-fungicides like Bacillus subtilis (Serenade) or Bacillus amyloliquefaciens (Double Nickel).",
                "Continue removing infected leaves and maintain proper spacing to reduce humidity.",
            ],
            Self::Severe => &[
                "Rotate fungicides with different modes of action, like strobilurins and chlorothalonil.",
                "Uproot and destroy heavily infected plants.",
                "Remove all plant debris and practice crop rotation to prevent overwintering pathogens.",
            ],
        }
    }

    fn infection_label(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Mild => "Mild Infection",
            Self::Moderate => "Moderate Infection",
            Self::Severe => "Severe Infection",
        }
    }
}

/// Fixed guidance text for a tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub headline: String,
    pub actions: &'static [&'static str],
}

impl Recommendation {
    pub fn for_tier(tier: SeverityTier) -> Self {
        let category = tier.category();
        let headline = match category {
            TreatmentCategory::Healthy => "Healthy Leaf".to_string(),
            _ => format!("Severity Index: {} ({})", tier, category.infection_label()),
        };
        Self {
            headline,
            actions: category.actions(),
        }
    }

    /// Headline followed by one bullet per action
    pub fn render(&self) -> String {
        let bullets = self
            .actions
            .iter()
            .map(|action| format!("• {action}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{}", self.headline, bullets)
    }
}

/// Step function from ratio to tier. Monotonic non-decreasing in `ratio`.
pub fn tier_for_ratio(ratio: f64) -> SeverityTier {
    if ratio <= 0.0 {
        return SeverityTier::HEALTHY;
    }
    if let Some(position) = INCLUSIVE_UPPER_BOUNDS.iter().position(|&bound| ratio <= bound) {
        return SeverityTier(position as u8 + 1);
    }
    if ratio < 1.0 {
        SeverityTier(10)
    } else {
        SeverityTier::MAX
    }
}

/// Tier and guidance for a ratio
pub fn classify(ratio: SeverityRatio) -> (SeverityTier, Recommendation) {
    let tier = tier_for_ratio(ratio.value());
    (tier, Recommendation::for_tier(tier))
}

/// Everything the caller needs to present a severity verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityAssessment {
    pub ratio: SeverityRatio,
    pub tier: SeverityTier,
    pub category: TreatmentCategory,
    pub recommendation: Recommendation,
}

impl SeverityAssessment {
    pub fn assess(ratio: SeverityRatio) -> Self {
        let (tier, recommendation) = classify(ratio);
        Self {
            ratio,
            tier,
            category: tier.category(),
            recommendation,
        }
    }

    pub fn percentage(&self) -> f64 {
        self.ratio.percentage()
    }

    /// e.g. `Severity: 12.34%`
    pub fn severity_label(&self) -> String {
        format!("Severity: {:.2}%", self.percentage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(diseased: u32, leaf: u32) -> SeverityRatio {
        SeverityRatio::from_counts(diseased, leaf).unwrap()
    }

    #[test]
    fn test_breakpoints() {
        let cases = [
            (0.0, 0),
            (0.0001, 1),
            (0.03, 1),
            (0.0301, 2),
            (0.06, 2),
            (0.12, 3),
            (0.2, 4),
            (0.25, 4),
            (0.5, 5),
            (0.75, 6),
            (0.8, 7),
            (0.87, 7),
            (0.94, 8),
            (0.97, 9),
            (0.99, 10),
            (1.0, 11),
            (1.7, 11),
        ];
        for (value, expected) in cases {
            assert_eq!(tier_for_ratio(value).index(), expected, "ratio {value}");
        }
    }

    #[test]
    fn test_count_based_boundaries_land_inclusive() {
        assert_eq!(classify(ratio(3, 100)).0.index(), 1);
        assert_eq!(classify(ratio(25, 100)).0.index(), 4);
        assert_eq!(classify(ratio(97, 100)).0.index(), 9);
        assert_eq!(classify(ratio(65535, 65536)).0.index(), 10);
    }

    #[test]
    fn test_monotonic() {
        let mut previous = SeverityTier::HEALTHY;
        for step in 0..=1500 {
            let tier = tier_for_ratio(step as f64 / 1000.0);
            assert!(tier >= previous, "tier decreased at step {step}");
            previous = tier;
        }
        assert_eq!(previous, SeverityTier::MAX);
    }

    #[test]
    fn test_healthy_recommendation() {
        let assessment = SeverityAssessment::assess(ratio(0, 65536));
        assert_eq!(assessment.tier, SeverityTier::HEALTHY);
        assert_eq!(assessment.category, TreatmentCategory::Healthy);
        assert_eq!(assessment.recommendation.render(), "Healthy Leaf\n\n• No treatment necessary.");
    }

    #[test]
    fn test_maximum_tier_is_severe() {
        let assessment = SeverityAssessment::assess(ratio(65536, 65536));
        assert_eq!(assessment.tier, SeverityTier::MAX);
        assert_eq!(assessment.category, TreatmentCategory::Severe);
        assert_eq!(assessment.recommendation.headline, "Severity Index: 11 (Severe Infection)");
    }

    #[test]
    fn test_category_bands() {
        let categories: Vec<_> = SeverityTier::all().map(|tier| tier.category()).collect();
        assert_eq!(categories.len(), SeverityTier::COUNT);
        assert_eq!(categories[0], TreatmentCategory::Healthy);
        assert!(categories[1..=3].iter().all(|c| *c == TreatmentCategory::Mild));
        assert!(categories[4..=6].iter().all(|c| *c == TreatmentCategory::Moderate));
        assert!(categories[7..].iter().all(|c| *c == TreatmentCategory::Severe));
    }

    #[test]
    fn test_severity_label() {
        let assessment = SeverityAssessment::assess(ratio(1234, 10000));
        assert_eq!(assessment.severity_label(), "Severity: 12.34%");
        assert_eq!(assessment.tier.index(), 4);
    }

    #[test]
    fn test_tier_new_bounds() {
        assert!(SeverityTier::new(11).is_some());
        assert!(SeverityTier::new(12).is_none());
        assert_eq!(SeverityTier::new(5).unwrap().range_label(), "(25%, 50%]");
    }
}
