//! Query Filters
//!
//! Filters are the core building blocks of a query descriptor.
//! Each filter represents a condition on a single attribute (column).

use chrono::NaiveDate;
use rk_core::traits::EntityId;

/// Filter operators that can be applied to values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equals (=), IN for lists
    Equals,
    /// Not equals (!), NOT IN for lists
    NotEquals,
    /// Contains (~)
    Contains,
    /// Does not contain (!~)
    NotContains,
    /// Starts with (**)
    StartsWith,
    /// Ends with (*~)
    EndsWith,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Between two values, inclusive (<>)
    Between,
    /// Is null (!*)
    IsNull,
    /// Is not null (*)
    IsNotNull,
}

impl FilterOperator {
    /// Parse operator from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Equals),
            "!" | "!=" => Some(Self::NotEquals),
            "~" => Some(Self::Contains),
            "!~" => Some(Self::NotContains),
            "**" => Some(Self::StartsWith),
            "*~" => Some(Self::EndsWith),
            ">" => Some(Self::GreaterThan),
            ">=" => Some(Self::GreaterThanOrEqual),
            "<" => Some(Self::LessThan),
            "<=" => Some(Self::LessThanOrEqual),
            "<>" | "<>d" => Some(Self::Between),
            "!*" => Some(Self::IsNull),
            "*" => Some(Self::IsNotNull),
            _ => None,
        }
    }

    /// Canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!",
            Self::Contains => "~",
            Self::NotContains => "!~",
            Self::StartsWith => "**",
            Self::EndsWith => "*~",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Between => "<>",
            Self::IsNull => "!*",
            Self::IsNotNull => "*",
        }
    }

    /// Check if this operator requires values
    pub fn requires_values(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Operators matching a text pattern
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::NotContains | Self::StartsWith | Self::EndsWith
        )
    }
}

/// Filter value types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Single primary key
    Id(EntityId),
    /// List of primary keys
    Ids(Vec<EntityId>),
    /// Single integer
    Int(i64),
    /// List of integers
    Ints(Vec<i64>),
    /// Single string value
    String(String),
    /// List of string values
    Strings(Vec<String>),
    /// Boolean value
    Bool(bool),
    /// Floating point value
    Number(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Inclusive range for `Between`
    Range {
        from: Box<FilterValue>,
        to: Box<FilterValue>,
    },
    /// No value (for null checks)
    None,
}

impl FilterValue {
    /// Create from a list of IDs
    pub fn from_ids(ids: Vec<EntityId>) -> Self {
        if ids.len() == 1 {
            Self::Id(ids[0].clone())
        } else {
            Self::Ids(ids)
        }
    }

    pub fn range(from: impl Into<FilterValue>, to: impl Into<FilterValue>) -> Self {
        Self::Range {
            from: Box::new(from.into()),
            to: Box::new(to.into()),
        }
    }
}

impl From<EntityId> for FilterValue {
    fn from(id: EntityId) -> Self {
        Self::Id(id)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(values: Vec<i64>) -> Self {
        Self::Ints(values)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::Strings(values)
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The attribute being filtered (e.g., "status", "owner_id")
    pub attribute: String,
    /// The operator to apply
    pub operator: FilterOperator,
    /// The values to filter by
    pub values: FilterValue,
}

impl Filter {
    /// Create a new filter
    pub fn new(attribute: impl Into<String>, operator: FilterOperator, values: FilterValue) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            values,
        }
    }

    /// Create an equals filter
    pub fn equals(attribute: impl Into<String>, values: impl Into<FilterValue>) -> Self {
        Self::new(attribute, FilterOperator::Equals, values.into())
    }

    /// Create a not equals filter
    pub fn not_equals(attribute: impl Into<String>, values: impl Into<FilterValue>) -> Self {
        Self::new(attribute, FilterOperator::NotEquals, values.into())
    }

    /// Create a contains filter
    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            attribute,
            FilterOperator::Contains,
            FilterValue::String(value.into()),
        )
    }

    /// Create an inclusive between filter
    pub fn between(
        attribute: impl Into<String>,
        from: impl Into<FilterValue>,
        to: impl Into<FilterValue>,
    ) -> Self {
        Self::new(attribute, FilterOperator::Between, FilterValue::range(from, to))
    }

    /// Create an is null filter
    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, FilterOperator::IsNull, FilterValue::None)
    }

    /// Create an is not null filter
    pub fn is_not_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, FilterOperator::IsNotNull, FilterValue::None)
    }

    /// Check if this filter is valid
    pub fn is_valid(&self) -> bool {
        if self.attribute.trim().is_empty() {
            return false;
        }

        match self.operator {
            FilterOperator::Between => matches!(self.values, FilterValue::Range { .. }),
            op if op.is_pattern() => matches!(self.values, FilterValue::String(_)),
            op if op.requires_values() => match &self.values {
                FilterValue::None | FilterValue::Range { .. } => false,
                FilterValue::Ids(v) => !v.is_empty(),
                FilterValue::Ints(v) => !v.is_empty(),
                FilterValue::Strings(v) => !v.is_empty(),
                _ => true,
            },
            _ => true,
        }
    }
}

/// Filter set - a collection of filters with AND semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a filter to the set
    pub fn add(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Get all filters
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Check if any filters are set
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

}
