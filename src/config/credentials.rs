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

use serde::Deserialize;

use crate::config::{parse_yaml, read_config_file};
use crate::error::{FlowError, FlowResult};

/// Connection settings for one credentials key. Field names follow the
/// source document convention.
#[derive(Clone, Deserialize)]
pub struct Credential {
    #[serde(rename = "Server")]
    pub server: String,
    #[serde(rename = "Database", default)]
    pub database: Option<String>,
    #[serde(rename = "Schema", default)]
    pub schema: Option<String>,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Warehouse", default)]
    pub warehouse: Option<String>,
    #[serde(rename = "Role", default)]
    pub role: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("user", &self.user)
            .field("password", &"***")
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .finish()
    }
}

/// The credentials document: key to connection settings.
#[derive(Debug, Clone)]
pub struct Credentials {
    path: PathBuf,
    entries: BTreeMap<String, Credential>,
}

impl Credentials {
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

    pub fn get(&self, key: &str) -> FlowResult<&Credential> {
        self.entries.get(key).ok_or_else(|| FlowError::UnknownCredentials {
            key: key.to_string(),
            path: self.path.clone(),
        })
    }
}
