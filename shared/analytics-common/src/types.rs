//! Row values exchanged between source selects and destination upserts
//!
//! A [`ComputedRow`] is the opaque tuple an aggregation's select produces for
//! one window. It is decoded column by column from the driver row and bound
//! back, value by value, as parameters of the destination insert.
//!
//! NUMERIC columns are not decoded: selects cast them to `::bigint` or
//! `::text`, and inserts cast the parameter back (`$4::bigint`).

use bytes::BytesMut;
use chrono::NaiveDate;
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Row;

use crate::error::AnalyticsError;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(value) => value.to_sql_checked(ty, out),
            SqlValue::Int(value) => {
                if *ty == Type::INT2 {
                    i16::try_from(*value)?.to_sql_checked(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*value)?.to_sql_checked(ty, out)
                } else {
                    value.to_sql_checked(ty, out)
                }
            }
            SqlValue::Float(value) => value.to_sql_checked(ty, out),
            SqlValue::Text(value) => value.to_sql_checked(ty, out),
            SqlValue::Date(value) => value.to_sql_checked(ty, out),
        }
    }

    // Each variant checks the concrete parameter type itself
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// One output tuple of an aggregation select
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputedRow {
    values: Vec<SqlValue>,
}

impl ComputedRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values as insert parameters, in column order
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect()
    }
}

impl From<Vec<SqlValue>> for ComputedRow {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::new(values)
    }
}

/// Decode a driver row into a [`ComputedRow`] by column type
pub fn row_values(row: &Row) -> Result<ComputedRow, AnalyticsError> {
    let mut values = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
        {
            row.try_get::<_, Option<String>>(idx)?.map(SqlValue::Text)
        } else if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::Int)
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(idx)?
                .map(|v| SqlValue::Int(i64::from(v)))
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(idx)?
                .map(|v| SqlValue::Int(i64::from(v)))
        } else if *ty == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::Float)
        } else if *ty == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(idx)?
                .map(|v| SqlValue::Float(f64::from(v)))
        } else if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(idx)?.map(SqlValue::Bool)
        } else if *ty == Type::DATE {
            row.try_get::<_, Option<NaiveDate>>(idx)?.map(SqlValue::Date)
        } else {
            return Err(AnalyticsError::UnsupportedColumn {
                column: column.name().to_string(),
                type_name: ty.name().to_string(),
            });
        };

        values.push(value.unwrap_or(SqlValue::Null));
    }

    Ok(ComputedRow::new(values))
}
