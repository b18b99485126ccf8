use serde::{Deserialize, Serialize};

use crate::models::Period;

/// Persisted filter state shared by every performance query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub period: Option<Period>,
    pub zone: Option<String>,
    pub limit: Option<u32>,
    pub months: Option<u32>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            period: Some(Period::Monthly),
            zone: None,
            limit: Some(10),
            months: Some(6),
        }
    }
}

/// What an override does to one filter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    /// Leave the persisted value alone.
    Keep,
    Set(T),
    /// Drop the key so it is no longer sent.
    Clear,
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Keep
    }
}

impl<T: Clone> Setting<T> {
    fn apply(&self, current: &Option<T>) -> Option<T> {
        match self {
            Setting::Keep => current.clone(),
            Setting::Set(value) => Some(value.clone()),
            Setting::Clear => None,
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Setting::Keep, Setting::Set)
    }
}

/// Per-call overrides. Any key that is set or cleared replaces the persisted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOverride {
    pub period: Setting<Period>,
    pub zone: Setting<String>,
    pub limit: Setting<u32>,
    pub months: Setting<u32>,
}

impl FilterOverride {
    #[cfg(test)]
    pub fn period(period: Period) -> Self {
        Self {
            period: Setting::Set(period),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Filters {
    pub fn merged(&self, over: &FilterOverride) -> Filters {
        Filters {
            period: over.period.apply(&self.period),
            zone: over.zone.apply(&self.zone),
            limit: over.limit.apply(&self.limit),
            months: over.months.apply(&self.months),
        }
    }

    /// Query parameters for the present keys only; absent keys are never sent.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(period) = self.period {
            pairs.push(("period".to_string(), period.as_str().to_string()));
        }
        if let Some(zone) = self.zone.as_deref().filter(|zone| !zone.is_empty()) {
            pairs.push(("zone".to_string(), zone.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(months) = self.months {
            pairs.push(("months".to_string(), months.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_per_key() {
        let defaults = Filters::default();
        let merged = defaults.merged(&FilterOverride::period(Period::Weekly));

        assert_eq!(merged.period, Some(Period::Weekly));
        assert_eq!(merged.zone, None);
        assert_eq!(merged.limit, Some(10));
        assert_eq!(merged.months, Some(6));
    }

    #[test]
    fn null_keys_are_omitted_from_query() {
        let merged = Filters::default().merged(&FilterOverride::period(Period::Weekly));
        let pairs = merged.query_pairs();

        assert_eq!(
            pairs,
            vec![
                ("period".to_string(), "weekly".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("months".to_string(), "6".to_string()),
            ]
        );
        assert!(!pairs.iter().any(|(_, v)| v == "null" || v == "undefined"));
    }

    #[test]
    fn zone_override_is_serialized() {
        let over = FilterOverride {
            zone: Setting::Set("north".to_string()),
            limit: Setting::Set(25),
            ..FilterOverride::default()
        };
        let pairs = Filters::default().merged(&over).query_pairs();
        assert!(pairs.contains(&("zone".to_string(), "north".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "25".to_string())));
    }

    #[test]
    fn cleared_key_drops_persisted_value() {
        let persisted = Filters {
            zone: Some("north".to_string()),
            ..Filters::default()
        };
        let over = FilterOverride {
            zone: Setting::Clear,
            ..FilterOverride::default()
        };
        let merged = persisted.merged(&over);

        assert_eq!(merged.zone, None);
        assert_eq!(merged.period, Some(Period::Monthly));
        assert_eq!(merged.limit, Some(10));
        assert!(!merged.query_pairs().iter().any(|(key, _)| key == "zone"));
    }

    #[test]
    fn empty_override_keeps_defaults() {
        let over = FilterOverride::default();
        assert!(over.is_empty());
        assert_eq!(Filters::default().merged(&over), Filters::default());
        assert_eq!(Setting::from(None::<u32>), Setting::Keep);
        assert_eq!(Setting::from(Some(3u32)), Setting::Set(3));
    }
}
