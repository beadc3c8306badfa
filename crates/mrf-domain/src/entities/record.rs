//! Reporting structure records
//!
//! A reporting structure groups the plans an index file reports on with the
//! in-network rate files that apply to them. Only the shape needed for
//! filtering is checked: both lists must be sequences of string-keyed,
//! string-valued mappings.

use crate::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field holding the reporting plan list
pub const REPORTING_PLANS_FIELD: &str = "reporting_plans";
/// Field holding the in-network file list
pub const IN_NETWORK_FILES_FIELD: &str = "in_network_files";

/// One plan entry of a reporting structure
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportingPlan(BTreeMap<String, String>);

impl ReportingPlan {
    /// Plan display name, e.g. `ACME PPO GOLD`
    pub fn plan_name(&self) -> Option<&str> {
        self.get("plan_name")
    }

    /// Plan identifier (EIN or HIOS id)
    pub fn plan_id(&self) -> Option<&str> {
        self.get("plan_id")
    }

    /// Kind of identifier stored in `plan_id`
    pub fn plan_id_type(&self) -> Option<&str> {
        self.get("plan_id_type")
    }

    /// Any field by name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReportingPlan {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Reference to a negotiated-rate file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InNetworkFile(BTreeMap<String, String>);

impl InNetworkFile {
    /// Download location (URL string as found in the document)
    pub fn location(&self) -> Option<&str> {
        self.get("location")
    }

    /// Human-readable file description
    pub fn description(&self) -> Option<&str> {
        self.get("description")
    }

    /// Any field by name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// All passthrough fields
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InNetworkFile {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One element of the selected array, shape-checked
///
/// Fields other than the two lists are ignored. A missing list is treated
/// as empty; a present list of any other shape is a schema error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportingRecord {
    /// Plans this structure reports on
    #[serde(default)]
    pub reporting_plans: Vec<ReportingPlan>,
    /// Files that apply to those plans
    #[serde(default)]
    pub in_network_files: Vec<InNetworkFile>,
}

impl ReportingRecord {
    /// Shape-check a materialized JSON element
    pub fn from_value(value: Value) -> DomainResult<Self> {
        if !value.is_object() {
            return Err(DomainError::schema(format!(
                "reporting structure must be an object, found {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| {
            DomainError::schema(format!(
                "{REPORTING_PLANS_FIELD}/{IN_NETWORK_FILES_FIELD} must be arrays of string-valued objects: {e}"
            ))
        })
    }

    /// All plan names joined with `|` (missing names contribute an empty part)
    pub fn plan_names(&self) -> String {
        self.reporting_plans
            .iter()
            .map(|plan| plan.plan_name().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Attach plan context to a file for logging
    pub fn enrich(&self, file: &InNetworkFile, plan_names: &str) -> EnrichedFile {
        let first = self.reporting_plans.first();
        EnrichedFile {
            fields: file.fields().clone(),
            plans: plan_names.to_string(),
            id: first.and_then(ReportingPlan::plan_id).map(str::to_string),
            id_type: first.and_then(ReportingPlan::plan_id_type).map(str::to_string),
        }
    }
}

/// An in-network file entry with the owning record's plan context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedFile {
    /// Passthrough fields of the file entry
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    /// Pipe-joined plan names of the record
    pub plans: String,
    /// `plan_id` of the first plan
    pub id: Option<String>,
    /// `plan_id_type` of the first plan
    #[serde(rename = "idType")]
    pub id_type: Option<String>,
}

/// A single string selected for emission
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputValue(String);

impl OutputValue {
    /// Wrap a string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
