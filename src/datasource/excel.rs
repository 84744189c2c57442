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
use calamine::{open_workbook_auto, Data, Reader};

use crate::config::catalog::ExcelDataset;
use crate::datasource::{table_from_builders, ColumnBuilder};
use crate::error::{FlowError, FlowResult};
use crate::exec::table::Table;

/// Read one named sheet of a workbook into a table. The first row is the
/// header; column types are promoted from the cell values.
pub fn load_excel(ds: &ExcelDataset) -> FlowResult<Table> {
    let mut workbook = open_workbook_auto(&ds.path).map_err(|e| {
        FlowError::Data(format!(
            "failed to open workbook `{}`: {e}",
            ds.path.display()
        ))
    })?;
    let range = workbook.worksheet_range(&ds.sheet).map_err(|e| {
        FlowError::Data(format!(
            "failed to read sheet `{}` from `{}`: {e}",
            ds.sheet,
            ds.path.display()
        ))
    })?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("col_{idx}"),
            other => other.to_string(),
        })
        .collect();

    let mut builders: Vec<ColumnBuilder> =
        (0..names.len()).map(|_| ColumnBuilder::unknown()).collect();
    let mut row_count = 0usize;
    for row in rows {
        for (idx, builder) in builders.iter_mut().enumerate() {
            match row.get(idx) {
                None | Some(Data::Empty) => builder.append_null(),
                Some(Data::Int(v)) => builder.append_int64(*v),
                Some(Data::Float(v)) => builder.append_float64(*v),
                Some(Data::Bool(v)) => builder.append_bool(*v),
                Some(Data::String(v)) => builder.append_utf8(v),
                Some(other) => builder.append_utf8(&other.to_string()),
            }
        }
        row_count += 1;
    }

    table_from_builders(names, builders, row_count)
}
