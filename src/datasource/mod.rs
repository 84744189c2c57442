// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Data-source loaders: catalog descriptor + credentials in, `Table` out.
//!
//! Loaders are stateless. Each call opens and releases its own resources;
//! nothing is shared across calls or runs.

pub mod csv;
pub mod excel;
pub mod sql;

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, NullArray, StringBuilder,
};
use arrow::datatypes::DataType;

use crate::config::catalog::CatalogEntry;
use crate::error::{FlowError, FlowResult};
use crate::exec::table::Table;

/// Load the data set described by `entry`. `credentials_path` is only
/// consulted for query-backed entries.
pub fn load(entry: &CatalogEntry, credentials_path: &Path) -> FlowResult<Table> {
    match entry {
        CatalogEntry::Csv(ds) => csv::load_csv(ds),
        CatalogEntry::Excel(ds) => excel::load_excel(ds),
        CatalogEntry::Sql(ds) => sql::load_sql(ds, credentials_path),
    }
}

/// Column accumulator promoted on first typed value. Columns that never
/// see a value finish as typed null arrays per their hint.
pub(crate) enum ColumnBuilder {
    Unknown { nulls: usize, hint: DataType },
    Bool(BooleanBuilder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Utf8(StringBuilder),
}

impl ColumnBuilder {
    pub(crate) fn unknown() -> Self {
        ColumnBuilder::Unknown {
            nulls: 0,
            hint: DataType::Null,
        }
    }

    pub(crate) fn for_type(dtype: &DataType) -> FlowResult<Self> {
        match dtype {
            DataType::Boolean => Ok(ColumnBuilder::Bool(BooleanBuilder::new())),
            DataType::Int64 => Ok(ColumnBuilder::Int64(Int64Builder::new())),
            DataType::Float64 => Ok(ColumnBuilder::Float64(Float64Builder::new())),
            DataType::Utf8 => Ok(ColumnBuilder::Utf8(StringBuilder::new())),
            DataType::Null => Ok(Self::unknown()),
            other => Err(FlowError::Data(format!(
                "unsupported column type: {other:?}"
            ))),
        }
    }

    pub(crate) fn append_null(&mut self) {
        match self {
            ColumnBuilder::Unknown { nulls, .. } => *nulls += 1,
            ColumnBuilder::Bool(b) => b.append_null(),
            ColumnBuilder::Int64(b) => b.append_null(),
            ColumnBuilder::Float64(b) => b.append_null(),
            ColumnBuilder::Utf8(b) => b.append_null(),
        }
    }

    pub(crate) fn append_bool(&mut self, value: bool) {
        match self {
            ColumnBuilder::Unknown { nulls, .. } => {
                let mut b = BooleanBuilder::new();
                for _ in 0..*nulls {
                    b.append_null();
                }
                b.append_value(value);
                *self = ColumnBuilder::Bool(b);
            }
            ColumnBuilder::Bool(b) => b.append_value(value),
            _ => self.append_null(),
        }
    }

    pub(crate) fn append_int64(&mut self, value: i64) {
        match self {
            ColumnBuilder::Unknown { nulls, .. } => {
                let mut b = Int64Builder::new();
                for _ in 0..*nulls {
                    b.append_null();
                }
                b.append_value(value);
                *self = ColumnBuilder::Int64(b);
            }
            ColumnBuilder::Int64(b) => b.append_value(value),
            ColumnBuilder::Float64(b) => b.append_value(value as f64),
            _ => self.append_null(),
        }
    }

    pub(crate) fn append_float64(&mut self, value: f64) {
        match self {
            ColumnBuilder::Unknown { nulls, .. } => {
                let mut b = Float64Builder::new();
                for _ in 0..*nulls {
                    b.append_null();
                }
                b.append_value(value);
                *self = ColumnBuilder::Float64(b);
            }
            ColumnBuilder::Float64(b) => b.append_value(value),
            // An int column that turns out to hold reals is rebuilt as f64.
            ColumnBuilder::Int64(b) => {
                let ints = b.finish();
                let mut promoted = Float64Builder::new();
                for idx in 0..ints.len() {
                    if ints.is_null(idx) {
                        promoted.append_null();
                    } else {
                        promoted.append_value(ints.value(idx) as f64);
                    }
                }
                promoted.append_value(value);
                *self = ColumnBuilder::Float64(promoted);
            }
            _ => self.append_null(),
        }
    }

    pub(crate) fn append_utf8(&mut self, value: &str) {
        match self {
            ColumnBuilder::Unknown { nulls, .. } => {
                let mut b = StringBuilder::new();
                for _ in 0..*nulls {
                    b.append_null();
                }
                b.append_value(value);
                *self = ColumnBuilder::Utf8(b);
            }
            ColumnBuilder::Utf8(b) => b.append_value(value),
            _ => self.append_null(),
        }
    }

    pub(crate) fn finish(self, row_count: usize) -> ArrayRef {
        match self {
            ColumnBuilder::Unknown { hint, .. } => null_array_for_type(&hint, row_count),
            ColumnBuilder::Bool(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Int64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Float64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Utf8(mut b) => Arc::new(b.finish()),
        }
    }
}

fn null_array_for_type(dtype: &DataType, len: usize) -> ArrayRef {
    match dtype {
        DataType::Boolean => {
            let mut b = BooleanBuilder::new();
            for _ in 0..len {
                b.append_null();
            }
            Arc::new(b.finish())
        }
        DataType::Int64 => {
            let mut b = Int64Builder::new();
            for _ in 0..len {
                b.append_null();
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::new();
            for _ in 0..len {
                b.append_null();
            }
            Arc::new(b.finish())
        }
        DataType::Utf8 => {
            let mut b = StringBuilder::new();
            for _ in 0..len {
                b.append_null();
            }
            Arc::new(b.finish())
        }
        _ => Arc::new(NullArray::new(len)),
    }
}

pub(crate) fn table_from_builders(
    names: Vec<String>,
    builders: Vec<ColumnBuilder>,
    row_count: usize,
) -> FlowResult<Table> {
    let columns: Vec<(String, ArrayRef)> = names
        .into_iter()
        .zip(builders)
        .map(|(name, builder)| (name, builder.finish(row_count)))
        .collect();
    Table::from_columns(columns)
}
