//! Query-string criteria (`field.operator=value`) and their translation into
//! SQL predicates.

pub mod filter;

pub use filter::{
    BooleanFilter, EventTypeFilter, FieldFilter, Filter, FilterValue, GenderTypeFilter,
    InstantFilter, IntegerFilter, LongFilter, RangeFilter, StringFilter,
};

use std::fmt;

use sqlx::{QueryBuilder, Sqlite};

use crate::error::ApiError;

/// Where a filtered field lives relative to the row being selected
#[derive(Debug, Clone, Copy)]
pub enum Column {
    /// A column of the selected row
    Plain(&'static str),
    /// A correlated set of values, matched with `EXISTS`.
    /// `source` is the FROM clause, `correlation` ties it to the outer row
    /// and `value` is the expression the filter compares.
    Exists {
        source: &'static str,
        correlation: &'static str,
        value: &'static str,
    },
}

impl Column {
    pub fn push<F: FieldFilter>(&self, qb: &mut QueryBuilder<'_, Sqlite>, filter: &F) {
        match *self {
            Column::Plain(column) => filter.push_predicates(qb, column),
            Column::Exists {
                source,
                correlation,
                value,
            } => {
                if filter.specified_value() == Some(false) {
                    qb.push(" AND NOT EXISTS (SELECT 1 FROM ")
                        .push(source)
                        .push(" WHERE ")
                        .push(correlation)
                        .push(")");
                    return;
                }
                qb.push(" AND EXISTS (SELECT 1 FROM ")
                    .push(source)
                    .push(" WHERE ")
                    .push(correlation);
                filter.push_predicates(qb, value);
                qb.push(")");
            }
        }
    }
}

/// Per-entity set of optional field filters
pub trait Criteria: Default + fmt::Debug + fmt::Display {
    /// Set `field.operator=value`; `Ok(false)` when the field is unknown
    fn set(&mut self, field: &str, operator: &str, value: &str) -> Result<bool, String>;

    /// Push one ` AND ...` predicate per filter that is present
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>);

    /// Parse criteria from raw query pairs. Parameters without an operator
    /// (`page`, `sort`) and unknown fields are ignored.
    fn from_params(params: &[(String, String)]) -> Result<Self, ApiError> {
        let mut criteria = Self::default();
        for (key, value) in params {
            let Some((field, operator)) = key.split_once('.') else {
                continue;
            };
            criteria
                .set(field, operator, value)
                .map_err(|e| ApiError::InvalidCriteria(format!("{}: {}", key, e)))?;
        }
        Ok(criteria)
    }
}

/// Declare a criteria struct: one optional filter per query field, each
/// mapped to the [`Column`] it constrains.
macro_rules! criteria {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $field:ident : $filter:ty = $param:literal => $column:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            $( pub $field: Option<$filter>, )+
        }

        impl $crate::criteria::Criteria for $name {
            fn set(&mut self, field: &str, operator: &str, value: &str) -> Result<bool, String> {
                use $crate::criteria::FieldFilter;
                match field {
                    $(
                        $param => {
                            self.$field
                                .get_or_insert_with(Default::default)
                                .apply(operator, value)?;
                            Ok(true)
                        }
                    )+
                    _ => Ok(false),
                }
            }

            fn push_where(&self, qb: &mut sqlx::QueryBuilder<'_, sqlx::Sqlite>) {
                $(
                    if let Some(filter) = &self.$field {
                        let column: $crate::criteria::Column = $column;
                        column.push(qb, filter);
                    }
                )+
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{{", stringify!($name))?;
                $(
                    if let Some(filter) = &self.$field {
                        write!(f, "{}={}, ", $param, filter)?;
                    }
                )+
                write!(f, "}}")
            }
        }
    };
}

mod entities;

pub use entities::*;
