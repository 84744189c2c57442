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
use std::path::PathBuf;

use thiserror::Error;

pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Failure taxonomy for pipeline construction, configuration loading,
/// data-set resolution and node execution.
///
/// Construction-time failures (`InvalidNode`, `InvalidPipeline`) cannot
/// yield a partially-built object. Run-time failures abort the remaining
/// plan and carry the offending node name.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("config file not found: {}", .path.display())]
    ConfigMissing { path: PathBuf },

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("data set `{name}` is not defined in catalog {}", .path.display())]
    UnknownDataset { name: String, path: PathBuf },

    #[error("data set `{name}` has unsupported type `{kind}`")]
    UnsupportedType { name: String, kind: String },

    #[error("credentials key `{key}` not found in {}", .path.display())]
    UnknownCredentials { key: String, path: PathBuf },

    #[error("unsupported database kind `{0}`")]
    UnsupportedDatabase(String),

    #[error("sql file not found: {}", .path.display())]
    SqlFileMissing { path: PathBuf },

    #[error("node `{node}` failed to resolve input `{dataset}`")]
    InputResolution {
        node: String,
        dataset: String,
        #[source]
        source: Box<FlowError>,
    },

    #[error("node `{node}` is missing required argument `{arg}`")]
    MissingArgument { node: String, arg: String },

    #[error("node `{node}` failed: {message}")]
    Node { node: String, message: String },

    #[error("run cancelled in node `{node}`")]
    Cancelled { node: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Data(String),
}

/// Error surface for user node bodies. String payloads keep transformation
/// code free of the crate's full taxonomy; `Cancelled` aborts the run.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

impl From<String> for NodeError {
    fn from(message: String) -> Self {
        NodeError::Failed(message)
    }
}

impl From<&str> for NodeError {
    fn from(message: &str) -> Self {
        NodeError::Failed(message.to_string())
    }
}
