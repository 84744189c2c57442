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
//! Common utilities and helpers for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use tempfile::TempDir;

use rillflow::{
    create_node, Bindings, Node, NodeFunc, NodeReturn, RunOptions, Signature, Table,
};

/// Test project: a temp directory with the conventional conf/ layout.
pub struct TestConfig {
    pub temp_dir: TempDir,
}

impl TestConfig {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        Ok(Self { temp_dir })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file under the project root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root().join("conf/base/catalog.yaml")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.root().join("conf/credentials/credentials.yaml")
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.root().join("conf/base/parameters.yaml")
    }

    /// Run options pointing at this project's conf files.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            catalog_path: self.catalog_path(),
            credentials_path: self.credentials_path(),
            ..RunOptions::default()
        }
    }
}

/// Run options whose config paths do not exist, so any catalog access
/// aborts the run.
pub fn options_without_catalog() -> RunOptions {
    RunOptions {
        catalog_path: PathBuf::from("/nonexistent/catalog.yaml"),
        credentials_path: PathBuf::from("/nonexistent/credentials.yaml"),
        ..RunOptions::default()
    }
}

/// A constant table of `rows` rows and `cols` float columns c0..cN.
pub fn constant_table(rows: usize, cols: usize) -> Table {
    let columns: Vec<(String, ArrayRef)> = (0..cols)
        .map(|c| {
            let values: Vec<f64> = (0..rows).map(|r| (r + c) as f64).collect();
            (
                format!("c{c}"),
                Arc::new(Float64Array::from(values)) as ArrayRef,
            )
        })
        .collect();
    Table::from_columns(columns).expect("constant table")
}

/// A source node with no inputs that emits a constant table.
pub fn source_node(name: &str, output: &str, rows: usize) -> Node {
    let func = NodeFunc::new(name, Signature::new(), move |_| {
        Ok(NodeReturn::table(constant_table(rows, 2)))
    });
    create_node(func, Bindings::none(), Bindings::single(output)).expect("source node")
}
