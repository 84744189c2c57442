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
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use csv::{ReaderBuilder, Trim};

use crate::config::catalog::{ColumnNames, CsvDataset};
use crate::error::{FlowError, FlowResult};
use crate::exec::table::Table;

/// Read a delimited-text data set into a table.
///
/// All fields are accumulated as strings; declared column types are cast
/// afterwards, undeclared columns get Int64 -> Float64 -> Utf8 inference.
pub fn load_csv(ds: &CsvDataset) -> FlowResult<Table> {
    let separator = single_byte(&ds.separator, "separator")?;
    let quote = single_byte(&ds.quote, "quote")?;

    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(separator)
        .quote(quote)
        .trim(if ds.trim_whitespace {
            Trim::All
        } else {
            Trim::None
        })
        .flexible(true);
    let mut reader = builder.from_path(&ds.path).map_err(|e| {
        FlowError::Data(format!(
            "failed to open csv file `{}`: {e}",
            ds.path.display()
        ))
    })?;

    let mut names: Option<Vec<String>> = match &ds.column_names {
        ColumnNames::Names(list) => Some(list.clone()),
        ColumnNames::Header(_) => None,
    };
    let mut header_pending = matches!(ds.column_names, ColumnNames::Header(true));

    let mut columns: Vec<Vec<Option<String>>> = Vec::new();
    let mut row_count = 0usize;
    for (record_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            FlowError::Data(format!(
                "failed to read csv row in `{}`: {e}",
                ds.path.display()
            ))
        })?;
        if record_idx < ds.skip_rows {
            continue;
        }
        if header_pending {
            names = Some(record.iter().map(|s| s.to_string()).collect());
            header_pending = false;
            continue;
        }
        let expected = match &names {
            Some(names) => names.len(),
            None => {
                // No header and no explicit names: width comes from the
                // first data row.
                let generated: Vec<String> =
                    (0..record.len()).map(|i| format!("col_{i}")).collect();
                let width = generated.len();
                names = Some(generated);
                width
            }
        };
        if columns.is_empty() {
            columns = (0..expected).map(|_| Vec::new()).collect();
        }
        if let Some(max) = ds.max_rows {
            if row_count >= max {
                break;
            }
        }
        if record.len() != expected {
            return Err(FlowError::Data(format!(
                "csv column count mismatch in `{}`: expected={} actual={} row_index={}",
                ds.path.display(),
                expected,
                record.len(),
                record_idx
            )));
        }
        for (idx, field) in record.iter().enumerate() {
            if ds.na_tokens.iter().any(|token| token == field) {
                columns[idx].push(None);
            } else {
                columns[idx].push(Some(field.to_string()));
            }
        }
        row_count += 1;
    }

    let names = names.unwrap_or_default();
    if columns.is_empty() {
        columns = (0..names.len()).map(|_| Vec::new()).collect();
    }

    let mut typed: Vec<(String, ArrayRef)> = Vec::with_capacity(names.len());
    for (name, values) in names.iter().zip(columns) {
        let raw: ArrayRef = Arc::new(StringArray::from(values));
        let array = match ds.column_types.get(name) {
            Some(kind) => cast(raw.as_ref(), &kind.arrow_type()).map_err(|e| {
                FlowError::Data(format!(
                    "failed to cast csv column `{name}` to {kind:?}: {e}"
                ))
            })?,
            None => infer_column(raw)?,
        };
        typed.push((name.clone(), array));
    }

    let table = Table::from_columns(typed)?;
    match &ds.columns {
        Some(subset) => table.select(subset),
        None => Ok(table),
    }
}

fn single_byte(value: &str, name: &str) -> FlowResult<u8> {
    let bytes = value.as_bytes();
    if bytes.len() != 1 {
        return Err(FlowError::Data(format!(
            "csv reader supports a single-byte `{name}` only, got `{value}`"
        )));
    }
    Ok(bytes[0])
}

fn infer_column(array: ArrayRef) -> FlowResult<ArrayRef> {
    let strings = array
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| FlowError::Data("csv column accumulator is not utf8".to_string()))?;

    let mut all_int = true;
    let mut all_float = true;
    let mut any_value = false;
    for value in strings.iter().flatten() {
        any_value = true;
        if all_int && value.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && value.parse::<f64>().is_err() {
            all_float = false;
        }
        if !all_int && !all_float {
            break;
        }
    }
    if !any_value {
        return Ok(array);
    }
    let target = if all_int {
        arrow::datatypes::DataType::Int64
    } else if all_float {
        arrow::datatypes::DataType::Float64
    } else {
        return Ok(array);
    };
    Ok(cast(array.as_ref(), &target)?)
}
