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
//! rillflow: a declarative DAG pipeline runner for tabular data.
//!
//! User code declares nodes (a function plus named input/output data sets
//! and parameter bindings), composes them into flat pipelines, and the
//! runner executes the selected nodes serially: inputs resolve against
//! the run-local environment first and fall back to the catalog's data
//! sources (delimited text, spreadsheets, SQL queries).

pub mod common;
pub mod config;
pub mod datasource;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod project;
pub mod runner;

pub use common::logging as rillflow_logging;
pub use config::catalog::{catalog_lookup, Catalog, CatalogEntry};
pub use config::credentials::{Credential, Credentials};
pub use config::params::{load_parameters, ParameterStore};
pub use error::{FlowError, FlowResult, NodeError};
pub use exec::table::Table;
pub use exec::value::{ArgBag, NodeReturn, ParamValue, Value};
pub use pipeline::node::{create_node, Bindings, Formal, Node, NodeFunc, Signature};
pub use pipeline::select::{select, Selection};
pub use pipeline::{create_pipeline, Pipeline, PipelineItem};
pub use project::{run_project, ProjectRegistry};
pub use runner::{run_pipeline, DataEnvironment, RunFailure, RunOptions, RunState};
