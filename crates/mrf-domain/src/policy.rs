//! Pluggable record predicate and projection
//!
//! The streaming engine hands every materialized [`ReportingRecord`] to a
//! [`RecordPolicy`]. Records that do not qualify are dropped; qualifying
//! records are projected into zero or more [`OutputValue`]s.

use crate::{
    DomainError, DomainResult,
    entities::{OutputValue, ReportingRecord},
    value_objects::{RegionCodeTable, RegionToken},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};
use url::Url;

/// Business rules applied to each record
pub trait RecordPolicy: Send + Sync {
    /// Whether the record takes part in projection at all
    fn qualifies(&self, record: &ReportingRecord) -> bool;

    /// Values to emit for a qualifying record, in document order
    fn project(&self, record: &ReportingRecord) -> DomainResult<Vec<OutputValue>>;

    /// Called once after the last record of a successful run
    fn finish(&self) {}
}

/// Configuration for [`PlanRegionPolicy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Substring a plan name must contain for its record to qualify
    pub plan_token: String,
    /// Region abbreviation (`NY`) or numeric URL code (`254`)
    pub region: String,
    /// Extra abbreviation to code pairs, taking precedence over built-ins
    pub region_overrides: BTreeMap<String, u32>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            plan_token: " PPO ".to_string(),
            region: "NY".to_string(),
            region_overrides: BTreeMap::new(),
        }
    }
}

/// Counters kept by [`PlanRegionPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PolicyStats {
    /// In-network files examined on qualifying records
    pub files_examined: u64,
    /// Files whose URL path carried the region token
    pub files_matched: u64,
}

/// Keeps records with a plan name containing a token and emits the
/// locations of their files whose URL path carries a region code.
#[derive(Debug)]
pub struct PlanRegionPolicy {
    plan_token: String,
    region: RegionToken,
    files_examined: AtomicU64,
    files_matched: AtomicU64,
}

impl PlanRegionPolicy {
    /// Create policy from explicit parts
    pub fn new(plan_token: impl Into<String>, region: RegionToken) -> DomainResult<Self> {
        let plan_token = plan_token.into();
        if plan_token.is_empty() {
            return Err(DomainError::invalid_input("plan token cannot be empty"));
        }

        Ok(Self {
            plan_token,
            region,
            files_examined: AtomicU64::new(0),
            files_matched: AtomicU64::new(0),
        })
    }

    /// Create policy from configuration, resolving the region against the
    /// built-in table merged with the configured overrides
    pub fn from_config(config: &PolicyConfig) -> DomainResult<Self> {
        let table = RegionCodeTable::builtin().with_overrides(
            config
                .region_overrides
                .iter()
                .map(|(abbr, code)| (abbr.as_str(), *code)),
        );
        let region = RegionToken::resolve(&config.region, &table)?;
        Self::new(config.plan_token.clone(), region)
    }

    /// Region this policy filters on
    pub fn region(&self) -> &RegionToken {
        &self.region
    }

    /// Plan name token
    pub fn plan_token(&self) -> &str {
        &self.plan_token
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            files_examined: self.files_examined.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
        }
    }
}

impl RecordPolicy for PlanRegionPolicy {
    fn qualifies(&self, record: &ReportingRecord) -> bool {
        record
            .reporting_plans
            .iter()
            .filter_map(|plan| plan.plan_name())
            .any(|name| name.contains(&self.plan_token))
    }

    fn project(&self, record: &ReportingRecord) -> DomainResult<Vec<OutputValue>> {
        let plan_names = record.plan_names();
        let mut values = Vec::new();

        for file in &record.in_network_files {
            let enriched = record.enrich(file, &plan_names);
            trace!(
                plans = %enriched.plans,
                id = enriched.id.as_deref().unwrap_or_default(),
                id_type = enriched.id_type.as_deref().unwrap_or_default(),
                location = file.location().unwrap_or_default(),
                "examining in-network file"
            );

            let location = file.location().ok_or_else(|| {
                DomainError::validation(format!(
                    "in-network file without location (plans: {plan_names})"
                ))
            })?;
            let url = Url::parse(location).map_err(|e| {
                DomainError::validation(format!("location '{location}' is not a URL: {e}"))
            })?;

            self.files_examined.fetch_add(1, Ordering::Relaxed);
            if self.region.matches_path(url.path()) {
                self.files_matched.fetch_add(1, Ordering::Relaxed);
                values.push(OutputValue::new(location));
            }
        }

        Ok(values)
    }

    fn finish(&self) {
        let stats = self.stats();
        if stats.files_examined > 0 && stats.files_matched == 0 {
            warn!(
                region = %self.region,
                needle = self.region.needle(),
                examined = stats.files_examined,
                "region token never appeared in any examined URL; the region mapping may be wrong"
            );
        } else {
            debug!(
                region = %self.region,
                examined = stats.files_examined,
                matched = stats.files_matched,
                "region filter summary"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> PlanRegionPolicy {
        PlanRegionPolicy::from_config(&PolicyConfig::default()).unwrap()
    }

    fn record(value: serde_json::Value) -> ReportingRecord {
        ReportingRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_qualifies_on_spaced_token() {
        let policy = policy();
        assert!(policy.qualifies(&record(json!({
            "reporting_plans": [{"plan_name": "HMO ONE"}, {"plan_name": "ACME PPO GOLD"}]
        }))));
        assert!(!policy.qualifies(&record(json!({
            "reporting_plans": [{"plan_name": "ACME PPOGOLD"}]
        }))));
        assert!(!policy.qualifies(&record(json!({"reporting_plans": []}))));
        assert!(!policy.qualifies(&record(json!({
            "reporting_plans": [{"plan_id": "1"}]
        }))));
    }

    #[test]
    fn test_project_filters_by_region_path() {
        let policy = policy();
        let values = policy
            .project(&record(json!({
                "reporting_plans": [{"plan_name": "A PPO B", "plan_id": "1", "plan_id_type": "EIN"}],
                "in_network_files": [
                    {"location": "https://h.example/2024-01_254_39B0_in-network-rates_4_of_9.json.gz?&Expires=1&Signature=x"},
                    {"location": "https://h.example/2024-01_301_39B0_in-network-rates_1_of_2.json.gz"},
                    {"location": "https://h.example/path?q=_254_"}
                ]
            })))
            .unwrap();

        assert_eq!(
            values,
            vec![OutputValue::new(
                "https://h.example/2024-01_254_39B0_in-network-rates_4_of_9.json.gz?&Expires=1&Signature=x"
            )]
        );
        assert_eq!(
            policy.stats(),
            PolicyStats {
                files_examined: 3,
                files_matched: 1
            }
        );
    }

    #[test]
    fn test_invalid_location_is_validation_error() {
        let err = policy()
            .project(&record(json!({
                "reporting_plans": [{"plan_name": "A PPO B"}],
                "in_network_files": [{"location": "not a url"}]
            })))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_missing_location_is_validation_error() {
        let err = policy()
            .project(&record(json!({
                "reporting_plans": [{"plan_name": "A PPO B"}],
                "in_network_files": [{"description": "no location"}]
            })))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_from_config_with_override() {
        let mut config = PolicyConfig {
            region: "CO".into(),
            ..PolicyConfig::default()
        };
        assert!(PlanRegionPolicy::from_config(&config).is_err());

        config.region_overrides.insert("CO".into(), 111);
        let policy = PlanRegionPolicy::from_config(&config).unwrap();
        assert_eq!(policy.region().needle(), "_111_");
    }

    #[test]
    fn test_empty_plan_token_rejected() {
        let region = RegionToken::resolve("254", &RegionCodeTable::empty()).unwrap();
        assert!(PlanRegionPolicy::new("", region).is_err());
    }
}
