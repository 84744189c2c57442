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
//! Configuration documents: parameters, catalog and credentials.
//!
//! All three are YAML files resolved against the process working directory
//! unless absolute. Paths default to the conventional project layout.

pub mod catalog;
pub mod credentials;
pub mod params;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{FlowError, FlowResult};

pub const DEFAULT_CATALOG_PATH: &str = "conf/base/catalog.yaml";
pub const DEFAULT_CREDENTIALS_PATH: &str = "conf/credentials/credentials.yaml";
pub const DEFAULT_PARAMETERS_PATH: &str = "conf/base/parameters.yaml";

pub(crate) fn read_config_file(path: &Path) -> FlowResult<String> {
    if !path.exists() {
        return Err(FlowError::ConfigMissing {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|e| FlowError::Io {
        context: format!("read config file {}", path.display()),
        source: e,
    })
}

pub(crate) fn parse_yaml<T: DeserializeOwned>(path: &Path, text: &str) -> FlowResult<T> {
    serde_yaml::from_str(text).map_err(|e| FlowError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}
