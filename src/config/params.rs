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
use std::path::Path;

use crate::config::{parse_yaml, read_config_file};
use crate::error::FlowResult;
use crate::exec::value::ParamValue;

/// Read-only, hierarchical parameter store loaded once per run.
///
/// Top-level keys form the namespace that node parameter bindings resolve
/// against. Keys are flat identifiers: `a.b` only matches a literal
/// top-level key spelled `a.b`, never a nested mapping.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterStore {
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = read_config_file(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: BTreeMap<String, ParamValue> = parse_yaml(path, &text)?;
        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, ParamValue)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The value stored under the exact top-level `key`, if any.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }
}

/// Load the parameters document at `path`.
pub fn load_parameters(path: impl AsRef<Path>) -> FlowResult<ParameterStore> {
    ParameterStore::load(path)
}
