use crate::models::EnvironmentalImpact;

/// Display band for a completion rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionBand {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl CompletionBand {
    pub fn from_rate(rate: f64) -> Self {
        match rate {
            r if r >= 80.0 => CompletionBand::Excellent,
            r if r >= 60.0 => CompletionBand::Good,
            r if r >= 40.0 => CompletionBand::Fair,
            _ => CompletionBand::NeedsImprovement,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CompletionBand::Excellent => "Excellent",
            CompletionBand::Good => "Good",
            CompletionBand::Fair => "Fair",
            CompletionBand::NeedsImprovement => "Needs improvement",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            CompletionBand::Excellent => "green",
            CompletionBand::Good => "blue",
            CompletionBand::Fair => "yellow",
            CompletionBand::NeedsImprovement => "red",
        }
    }
}

// Conversion factors for the "what this means" figures.
const CO2_KG_PER_TREE_YEAR: f64 = 21.77;
const CO2_KG_PER_CAR_KM: f64 = 0.192;
const WATER_LITRES_PER_SHOWER: f64 = 65.0;
const ENERGY_KWH_PER_HOUSEHOLD_DAY: f64 = 29.0;

/// Everyday equivalents of the upstream sustainability figures.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImpactEquivalents {
    pub trees: f64,
    pub car_km_avoided: f64,
    pub showers: f64,
    pub household_days: f64,
}

fn per(amount: f64, factor: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount / factor
    } else {
        0.0
    }
}

impl From<&EnvironmentalImpact> for ImpactEquivalents {
    fn from(impact: &EnvironmentalImpact) -> Self {
        Self {
            trees: per(impact.co2_saved, CO2_KG_PER_TREE_YEAR),
            car_km_avoided: per(impact.co2_saved, CO2_KG_PER_CAR_KM),
            showers: per(impact.water_saved, WATER_LITRES_PER_SHOWER),
            household_days: per(impact.energy_saved, ENERGY_KWH_PER_HOUSEHOLD_DAY),
        }
    }
}
