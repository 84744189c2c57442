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
use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch};
use arrow::datatypes::{Field, Schema};

use crate::error::{FlowError, FlowResult};

/// An in-memory tabular value, the payload that flows between nodes.
/// Wrapper around an Arrow RecordBatch with a column-name index.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
    name_to_index: Arc<HashMap<String, usize>>,
}

impl Table {
    pub fn try_new(batch: RecordBatch) -> FlowResult<Self> {
        let name_to_index = name_to_index_from_schema(batch.schema().as_ref())?;
        Ok(Self {
            batch,
            name_to_index: Arc::new(name_to_index),
        })
    }

    /// Assemble a table from named columns. Every array must have the same
    /// length; all fields are nullable.
    pub fn from_columns(columns: Vec<(String, ArrayRef)>) -> FlowResult<Self> {
        if columns.is_empty() {
            return Ok(Table::default());
        }
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(name.clone(), array.data_type().clone(), true))
            .collect();
        let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Self::try_new(batch)
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> FlowResult<ArrayRef> {
        let idx = self.name_to_index.get(name).copied().ok_or_else(|| {
            FlowError::Data(format!(
                "column `{}` not found in table (columns={:?})",
                name,
                self.column_names()
            ))
        })?;
        Ok(self.batch.column(idx).clone())
    }

    /// Returns a new table with `name` bound to `array`, replacing an
    /// existing column of that name or appending a new one.
    pub fn with_column(&self, name: &str, array: ArrayRef) -> FlowResult<Table> {
        if array.len() != self.len() {
            return Err(FlowError::Data(format!(
                "column `{}` length mismatch: table has {} rows, array has {}",
                name,
                self.len(),
                array.len()
            )));
        }
        let mut columns: Vec<(String, ArrayRef)> = self
            .column_names()
            .iter()
            .map(|n| n.to_string())
            .zip(self.batch.columns().iter().cloned())
            .collect();
        match self.name_to_index.get(name) {
            Some(&idx) => columns[idx].1 = array,
            None => columns.push((name.to_string(), array)),
        }
        Table::from_columns(columns)
    }

    /// Projection to a subset of columns, in the requested order.
    pub fn select(&self, names: &[String]) -> FlowResult<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push((name.clone(), self.column(name)?));
        }
        Table::from_columns(columns)
    }

    /// A zero-copy window of `length` rows starting at `offset`.
    pub fn slice(&self, offset: usize, length: usize) -> Table {
        Table {
            batch: self.batch.slice(offset, length),
            name_to_index: Arc::clone(&self.name_to_index),
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
            name_to_index: Arc::new(HashMap::new()),
        }
    }
}

fn name_to_index_from_schema(schema: &Schema) -> FlowResult<HashMap<String, usize>> {
    let mut map = HashMap::new();
    for (idx, field) in schema.fields().iter().enumerate() {
        if map.insert(field.name().clone(), idx).is_some() {
            // Duplicate names would make name-based input resolution ambiguous.
            return Err(FlowError::Data(format!(
                "duplicate column name `{}` in table schema",
                field.name()
            )));
        }
    }
    Ok(map)
}
