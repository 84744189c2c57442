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
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::config::{parse_yaml, read_config_file};
use crate::error::{FlowError, FlowResult};

/// Typed descriptor for one catalog data set. The `type` field of the
/// source document selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEntry {
    #[serde(rename = "CSVDataset")]
    Csv(CsvDataset),
    #[serde(rename = "EXCELDataset")]
    Excel(ExcelDataset),
    #[serde(rename = "SQLDataSet")]
    Sql(SqlDataset),
}

/// Delimited-text data set. The option set is closed: nothing else from
/// the source document is forwarded to the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvDataset {
    pub path: PathBuf,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_quote")]
    pub quote: String,
    /// `true`: first data row is the header. `false`: columns are named
    /// `col_0..col_n`. Explicit list: the file has no header row.
    #[serde(default = "default_column_names")]
    pub column_names: ColumnNames,
    #[serde(default)]
    pub column_types: BTreeMap<String, ColumnKind>,
    /// Rows dropped before any header handling.
    #[serde(default)]
    pub skip_rows: usize,
    /// Cap on data rows; unlimited when absent.
    #[serde(default)]
    pub max_rows: Option<usize>,
    #[serde(default = "default_na_tokens")]
    pub na_tokens: Vec<String>,
    #[serde(default)]
    pub trim_whitespace: bool,
    /// Column subset, projected after reading.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnNames {
    Header(bool),
    Names(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Bool,
    Int,
    Float,
    String,
}

impl ColumnKind {
    pub(crate) fn arrow_type(self) -> DataType {
        match self {
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::String => DataType::Utf8,
        }
    }
}

fn default_separator() -> String {
    ",".to_string()
}

fn default_quote() -> String {
    "\"".to_string()
}

fn default_column_names() -> ColumnNames {
    ColumnNames::Header(true)
}

fn default_na_tokens() -> Vec<String> {
    vec![String::new(), "NA".to_string()]
}

/// Spreadsheet data set: one named sheet of one workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcelDataset {
    pub path: PathBuf,
    pub sheet: String,
}

/// Query-backed data set. The query text lives in a separate file and the
/// connection settings under a credentials key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDataset {
    pub database_kind: String,
    pub sql_path: PathBuf,
    pub credentials_key: String,
}

const KNOWN_TYPES: [&str; 3] = ["CSVDataset", "EXCELDataset", "SQLDataSet"];

/// The loaded catalog document: data-set name to raw descriptor. Entries
/// are typed lazily so one bad descriptor does not poison the others.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    entries: BTreeMap<String, serde_yaml::Value>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = read_config_file(path)?;
        let entries = if text.trim().is_empty() {
            BTreeMap::new()
        } else {
            parse_yaml(path, &text)?
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// The typed descriptor for `name`.
    pub fn entry(&self, name: &str) -> FlowResult<CatalogEntry> {
        let raw = self.entries.get(name).ok_or_else(|| FlowError::UnknownDataset {
            name: name.to_string(),
            path: self.path.clone(),
        })?;
        let kind = raw
            .get("type")
            .and_then(serde_yaml::Value::as_str)
            .unwrap_or("(unspecified)");
        if !KNOWN_TYPES.contains(&kind) {
            return Err(FlowError::UnsupportedType {
                name: name.to_string(),
                kind: kind.to_string(),
            });
        }
        serde_yaml::from_value(raw.clone()).map_err(|e| FlowError::ConfigParse {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// One-shot lookup: load the catalog at `path` and type the named entry.
pub fn catalog_lookup(name: &str, path: impl AsRef<Path>) -> FlowResult<CatalogEntry> {
    Catalog::load(path)?.entry(name)
}
