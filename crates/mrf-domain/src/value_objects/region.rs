//! Region code table and resolved region tokens
//!
//! Index files name their in-network files after a state abbreviation
//! (`2024-01_NY_39B0_in-network-rates_4_of_9.json.gz`) while the signed URL
//! carries a numeric code in the same position
//! (`/2024-01_254_39B0_in-network-rates_4_of_9.json.gz`). The mapping between
//! the two was inferred from observed data, so the table is overridable.

use crate::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Built-in abbreviation to URL code pairs
const BUILTIN_REGIONS: &[(&str, u32)] = &[("NY", 254)];

/// Immutable lookup from region abbreviation to numeric URL token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCodeTable {
    codes: HashMap<String, u32>,
}

impl RegionCodeTable {
    /// Table with the built-in observed pairs
    pub fn builtin() -> Self {
        Self {
            codes: BUILTIN_REGIONS
                .iter()
                .map(|(abbr, code)| ((*abbr).to_string(), *code))
                .collect(),
        }
    }

    /// Empty table; only numeric region tokens resolve against it
    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// New table with `overrides` taking precedence over existing entries
    pub fn with_overrides<I, S>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut codes = self.codes.clone();
        for (abbr, code) in overrides {
            codes.insert(abbr.as_ref().trim().to_ascii_uppercase(), code);
        }
        Self { codes }
    }

    /// Look up the numeric code for an abbreviation (case-insensitive)
    pub fn code_for(&self, abbreviation: &str) -> Option<u32> {
        self.codes
            .get(&abbreviation.trim().to_ascii_uppercase())
            .copied()
    }

    /// Number of known regions
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for RegionCodeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A region resolved to the numeric token searched for in URL paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionToken {
    label: String,
    code: u32,
    needle: String,
}

impl RegionToken {
    /// Resolve a region given either as an abbreviation (`NY`) or as a raw
    /// numeric code (`254`)
    pub fn resolve(input: &str, table: &RegionCodeTable) -> DomainResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_region("region cannot be empty"));
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let code = trimmed
                .parse::<u32>()
                .map_err(|e| DomainError::invalid_region(format!("'{trimmed}': {e}")))?;
            // Digits are searched for as written, leading zeros included
            return Ok(Self {
                label: trimmed.to_string(),
                code,
                needle: format!("_{trimmed}_"),
            });
        }

        let code = table.code_for(trimmed).ok_or_else(|| {
            DomainError::invalid_region(format!(
                "no numeric code known for '{trimmed}'; pass the code directly or add a mapping"
            ))
        })?;
        Ok(Self {
            label: trimmed.to_ascii_uppercase(),
            code,
            needle: format!("_{code}_"),
        })
    }

    /// Numeric code
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Region as the caller named it
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Substring searched for in URL paths, e.g. `_254_`
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Check whether a URL path carries this region token
    pub fn matches_path(&self, path: &str) -> bool {
        path.contains(&self.needle)
    }
}

impl fmt::Display for RegionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.bytes().all(|b| b.is_ascii_digit()) {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{} ({})", self.label, self.code)
        }
    }
}
