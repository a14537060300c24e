use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::models::{EventType, GenderType};

/// A value type that can appear in a query-string filter.
pub trait FilterValue: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Name used when a filter over this type is rendered, e.g. `LongFilter`
    const FILTER_NAME: &'static str;

    fn parse_value(raw: &str) -> Result<Self, String>;

    fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>);
}

impl FilterValue for i64 {
    const FILTER_NAME: &'static str = "LongFilter";

    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid long", raw))
    }

    fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push_bind(*self);
    }
}

impl FilterValue for i32 {
    const FILTER_NAME: &'static str = "IntegerFilter";

    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid integer", raw))
    }

    fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push_bind(*self);
    }
}

impl FilterValue for bool {
    const FILTER_NAME: &'static str = "BooleanFilter";

    fn parse_value(raw: &str) -> Result<Self, String> {
        parse_bool(raw)
    }

    fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push_bind(*self);
    }
}

impl FilterValue for String {
    const FILTER_NAME: &'static str = "StringFilter";

    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }

    fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push_bind(self.clone());
    }
}

impl FilterValue for DateTime<Utc> {
    const FILTER_NAME: &'static str = "InstantFilter";

    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid instant", raw))
    }

    fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push_bind(*self);
    }
}

macro_rules! enum_filter_value {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl FilterValue for $ty {
                const FILTER_NAME: &'static str = $name;

                fn parse_value(raw: &str) -> Result<Self, String> {
                    raw.parse()
                }

                fn bind_to(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
                    qb.push_bind(self.as_str().to_string());
                }
            }
        )+
    };
}

enum_filter_value!(
    GenderType => "GenderTypeFilter",
    EventType => "EventTypeFilter",
);

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("'{}' is not a valid boolean", raw)),
    }
}

/// Behaviour shared by every per-field filter
pub trait FieldFilter: Default + Clone + fmt::Debug + fmt::Display {
    /// Set one operator from its raw query-string value
    fn apply(&mut self, operator: &str, raw: &str) -> Result<(), String>;

    /// Push ` AND <predicate>` for every operator that is set.
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Sqlite>, column: &str);

    fn specified_value(&self) -> Option<bool>;
}

/// `equals`, `in` and `specified`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter<T> {
    pub equals: Option<T>,
    pub in_list: Option<Vec<T>>,
    pub specified: Option<bool>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            equals: None,
            in_list: None,
            specified: None,
        }
    }
}

impl<T: FilterValue> Filter<T> {
    pub fn equal_to(value: T) -> Self {
        Self {
            equals: Some(value),
            ..Self::default()
        }
    }

    pub fn one_of(values: Vec<T>) -> Self {
        Self {
            in_list: Some(values),
            ..Self::default()
        }
    }

    pub fn is_specified(specified: bool) -> Self {
        Self {
            specified: Some(specified),
            ..Self::default()
        }
    }

    fn describe(&self, parts: &mut Vec<String>) {
        if let Some(value) = &self.equals {
            parts.push(format!("equals={}", value));
        }
        if let Some(values) = &self.in_list {
            let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
            parts.push(format!("in=[{}]", joined.join(", ")));
        }
        if let Some(specified) = self.specified {
            parts.push(format!("specified={}", specified));
        }
    }
}

impl<T: FilterValue> FieldFilter for Filter<T> {
    fn apply(&mut self, operator: &str, raw: &str) -> Result<(), String> {
        match operator {
            "equals" => self.equals = Some(T::parse_value(raw)?),
            "in" => {
                let values = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(T::parse_value)
                    .collect::<Result<Vec<_>, _>>()?;
                self.in_list.get_or_insert_with(Vec::new).extend(values);
            }
            "specified" => self.specified = Some(parse_bool(raw)?),
            other => return Err(format!("unknown operator '{}'", other)),
        }
        Ok(())
    }

    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Sqlite>, column: &str) {
        if let Some(value) = &self.equals {
            qb.push(" AND ").push(column).push(" = ");
            value.bind_to(qb);
        }
        if let Some(values) = &self.in_list {
            if values.is_empty() {
                qb.push(" AND 1 = 0");
            } else {
                qb.push(" AND ").push(column).push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    value.bind_to(qb);
                }
                qb.push(")");
            }
        }
        match self.specified {
            Some(true) => {
                qb.push(" AND ").push(column).push(" IS NOT NULL");
            }
            Some(false) => {
                qb.push(" AND ").push(column).push(" IS NULL");
            }
            None => {}
        }
    }

    fn specified_value(&self) -> Option<bool> {
        self.specified
    }
}

impl<T: FilterValue> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        self.describe(&mut parts);
        write_filter(f, T::FILTER_NAME, &parts)
    }
}

/// [`Filter`] plus ordering comparisons
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter<T> {
    pub base: Filter<T>,
    pub greater_than: Option<T>,
    pub less_than: Option<T>,
    pub greater_or_equal_than: Option<T>,
    pub less_or_equal_than: Option<T>,
}

impl<T> Default for RangeFilter<T> {
    fn default() -> Self {
        Self {
            base: Filter::default(),
            greater_than: None,
            less_than: None,
            greater_or_equal_than: None,
            less_or_equal_than: None,
        }
    }
}

impl<T: FilterValue> RangeFilter<T> {
    pub fn equal_to(value: T) -> Self {
        Self {
            base: Filter::equal_to(value),
            ..Self::default()
        }
    }

    pub fn between(from: T, to: T) -> Self {
        Self {
            greater_or_equal_than: Some(from),
            less_or_equal_than: Some(to),
            ..Self::default()
        }
    }
}

impl<T: FilterValue> FieldFilter for RangeFilter<T> {
    fn apply(&mut self, operator: &str, raw: &str) -> Result<(), String> {
        match operator {
            "greaterThan" => self.greater_than = Some(T::parse_value(raw)?),
            "lessThan" => self.less_than = Some(T::parse_value(raw)?),
            "greaterOrEqualThan" => self.greater_or_equal_than = Some(T::parse_value(raw)?),
            "lessOrEqualThan" => self.less_or_equal_than = Some(T::parse_value(raw)?),
            _ => return self.base.apply(operator, raw),
        }
        Ok(())
    }

    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Sqlite>, column: &str) {
        self.base.push_predicates(qb, column);
        let bounds = [
            (&self.greater_than, " > "),
            (&self.less_than, " < "),
            (&self.greater_or_equal_than, " >= "),
            (&self.less_or_equal_than, " <= "),
        ];
        for (bound, op) in bounds {
            if let Some(value) = bound {
                qb.push(" AND ").push(column).push(op);
                value.bind_to(qb);
            }
        }
    }

    fn specified_value(&self) -> Option<bool> {
        self.base.specified
    }
}

impl<T: FilterValue> fmt::Display for RangeFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        self.base.describe(&mut parts);
        let bounds = [
            (&self.greater_than, "greaterThan"),
            (&self.less_than, "lessThan"),
            (&self.greater_or_equal_than, "greaterOrEqualThan"),
            (&self.less_or_equal_than, "lessOrEqualThan"),
        ];
        for (bound, name) in bounds {
            if let Some(value) = bound {
                parts.push(format!("{}={}", name, value));
            }
        }
        write_filter(f, T::FILTER_NAME, &parts)
    }
}

/// [`Filter<String>`] plus case-insensitive `contains`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringFilter {
    pub base: Filter<String>,
    pub contains: Option<String>,
}

impl StringFilter {
    pub fn equal_to(value: impl Into<String>) -> Self {
        Self {
            base: Filter::equal_to(value.into()),
            contains: None,
        }
    }

    pub fn containing(value: impl Into<String>) -> Self {
        Self {
            base: Filter::default(),
            contains: Some(value.into()),
        }
    }
}

impl FieldFilter for StringFilter {
    fn apply(&mut self, operator: &str, raw: &str) -> Result<(), String> {
        match operator {
            "contains" => {
                self.contains = Some(raw.to_string());
                Ok(())
            }
            _ => self.base.apply(operator, raw),
        }
    }

    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Sqlite>, column: &str) {
        self.base.push_predicates(qb, column);
        if let Some(needle) = &self.contains {
            qb.push(" AND LOWER(")
                .push(column)
                .push(") LIKE ")
                .push_bind(format!("%{}%", escape_like(&needle.to_lowercase())))
                .push(" ESCAPE '\\'");
        }
    }

    fn specified_value(&self) -> Option<bool> {
        self.base.specified
    }
}

impl fmt::Display for StringFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        self.base.describe(&mut parts);
        if let Some(needle) = &self.contains {
            parts.push(format!("contains={}", needle));
        }
        write_filter(f, String::FILTER_NAME, &parts)
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn write_filter(f: &mut fmt::Formatter<'_>, name: &str, parts: &[String]) -> fmt::Result {
    write!(f, "{} [", name)?;
    for part in parts {
        write!(f, "{}, ", part)?;
    }
    write!(f, "]")
}

pub type LongFilter = RangeFilter<i64>;
pub type IntegerFilter = RangeFilter<i32>;
pub type InstantFilter = RangeFilter<DateTime<Utc>>;
pub type BooleanFilter = Filter<bool>;
pub type GenderTypeFilter = Filter<GenderType>;
pub type EventTypeFilter = Filter<EventType>;
