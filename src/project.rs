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
//! Project-level entry point: run a registered pipeline against a
//! conventional `conf/` layout rooted at an explicit project directory.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::config::params::ParameterStore;
use crate::config::{DEFAULT_CATALOG_PATH, DEFAULT_CREDENTIALS_PATH, DEFAULT_PARAMETERS_PATH};
use crate::error::{FlowError, FlowResult};
use crate::pipeline::select::Selection;
use crate::pipeline::Pipeline;
use crate::runner::{run_pipeline, DataEnvironment, RunOptions};

type PipelineFactory = Box<dyn Fn(&ParameterStore) -> FlowResult<Pipeline> + Send + Sync>;

/// Named pipeline factories. User code registers its pipelines here and
/// `run_project` builds them with the project's parameters.
#[derive(Default)]
pub struct ProjectRegistry {
    factories: BTreeMap<String, PipelineFactory>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&ParameterStore) -> FlowResult<Pipeline> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    fn build(&self, name: &str, parameters: &ParameterStore) -> FlowResult<Pipeline> {
        let factory = self.factories.get(name).ok_or_else(|| {
            FlowError::InvalidPipeline(format!("no pipeline `{name}` is registered"))
        })?;
        factory(parameters)
    }
}

impl std::fmt::Debug for ProjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectRegistry")
            .field("pipelines", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Load the project configuration under `root`, build the named pipeline
/// through the registry and run the selected nodes.
pub fn run_project(
    root: impl AsRef<Path>,
    registry: &ProjectRegistry,
    pipeline_name: &str,
    selection: &Selection,
) -> anyhow::Result<DataEnvironment> {
    let root = root.as_ref();
    let parameters = ParameterStore::load(root.join(DEFAULT_PARAMETERS_PATH))
        .with_context(|| format!("load parameters for project {}", root.display()))?;
    let pipeline = registry.build(pipeline_name, &parameters)?;

    info!(
        project = %root.display(),
        pipeline = pipeline_name,
        nodes = pipeline.len(),
        "running project pipeline"
    );

    let options = RunOptions {
        catalog_path: root.join(DEFAULT_CATALOG_PATH),
        credentials_path: root.join(DEFAULT_CREDENTIALS_PATH),
        selection: selection.clone(),
        seed: Vec::new(),
    };
    let env = run_pipeline(&pipeline, &parameters, &options)?;
    Ok(env)
}
