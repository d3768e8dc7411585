//! Sort criteria for a query descriptor

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    /// Accepts `asc`/`desc` and their long forms, in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(other.to_string()),
        }
    }
}

/// One `ORDER BY` term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    pub attribute: String,
    pub direction: SortDirection,
}

impl SortCriterion {
    pub fn new(attribute: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            attribute: attribute.into(),
            direction,
        }
    }

    pub fn asc(attribute: impl Into<String>) -> Self {
        Self::new(attribute, SortDirection::Asc)
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self::new(attribute, SortDirection::Desc)
    }

    /// Parse `attr`, `attr:asc` or `attr:desc`
    pub fn parse(part: &str) -> Option<Self> {
        let part = part.trim();
        let (attribute, direction) = match part.rsplit_once(':') {
            Some((attribute, direction)) => (attribute, direction.parse().ok()?),
            None => (part, SortDirection::Asc),
        };

        (!attribute.is_empty()).then(|| Self::new(attribute, direction))
    }
}

/// Ordered list of sort criteria; earlier entries take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, criterion: SortCriterion) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    /// Parse a comma separated list such as `"name:desc,id"`.
    ///
    /// Returns the first segment that could not be parsed as the error.
    pub fn parse(sort: &str) -> Result<Self, String> {
        let mut order = Self::new();
        for part in sort.split(',').filter(|p| !p.trim().is_empty()) {
            let criterion = SortCriterion::parse(part).ok_or_else(|| part.trim().to_string())?;
            order.add(criterion);
        }
        Ok(order)
    }

    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }
}
