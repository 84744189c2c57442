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
//! The pipeline runner: executes selected nodes serially, resolving
//! inputs against the run-local environment with catalog fallback.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::catalog::Catalog;
use crate::config::params::ParameterStore;
use crate::config::{DEFAULT_CATALOG_PATH, DEFAULT_CREDENTIALS_PATH};
use crate::datasource;
use crate::error::{FlowError, NodeError};
use crate::exec::value::{ArgBag, NodeReturn, ParamValue, Value};
use crate::pipeline::node::{Bindings, Node};
use crate::pipeline::select::{select, Selection};
use crate::pipeline::Pipeline;

/// Per-run scratchpad: every value a node produced or the catalog loaded,
/// keyed by data-set name. Written only by the runner, read-only once the
/// run returns. Not a cache across runs.
#[derive(Debug, Clone, Default)]
pub struct DataEnvironment {
    values: HashMap<String, Value>,
}

impl DataEnvironment {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

/// Where the runner was within a node when a failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Resolving,
    Executing,
    Storing,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Resolving => write!(f, "resolving inputs"),
            RunState::Executing => write!(f, "executing"),
            RunState::Storing => write!(f, "storing outputs"),
        }
    }
}

/// A failed run: the offending node, the phase it failed in, the cause,
/// and the environment as it stood when the run aborted. Nodes already
/// executed keep their outputs in `partial`.
#[derive(Debug, Error)]
#[error("pipeline run failed at node `{node}` while {state}: {error}")]
pub struct RunFailure {
    pub node: String,
    pub state: RunState,
    #[source]
    pub error: FlowError,
    pub partial: DataEnvironment,
}

/// Settings for one run. Paths are interpreted against the process
/// working directory; `seed` pre-binds values into the environment so
/// memory precedence applies to them.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub catalog_path: PathBuf,
    pub credentials_path: PathBuf,
    pub selection: Selection,
    pub seed: Vec<(String, Value)>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            selection: Selection::default(),
            seed: Vec::new(),
        }
    }
}

/// Run the selected nodes of `pipeline` in order and return the data
/// environment. Any node failure aborts the remaining plan; the partial
/// environment travels with the error.
pub fn run_pipeline(
    pipeline: &Pipeline,
    parameters: &ParameterStore,
    options: &RunOptions,
) -> Result<DataEnvironment, RunFailure> {
    let started = Instant::now();
    let selected = select(pipeline, &options.selection);

    let mut env = DataEnvironment::default();
    for (name, value) in &options.seed {
        env.insert(name.clone(), value.clone());
    }

    // The catalog is only read on the first memory miss, so runs that
    // stay in memory never touch the file.
    let mut catalog: Option<Catalog> = None;
    let mut loaded = 0usize;

    for node in &selected {
        if let Err((state, error)) =
            run_node(node, parameters, options, &mut catalog, &mut env, &mut loaded)
        {
            return Err(RunFailure {
                node: node.name().to_string(),
                state,
                error,
                partial: env,
            });
        }
    }

    info!(
        nodes = selected.len(),
        datasets_loaded = loaded,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline run complete"
    );
    Ok(env)
}

type NodeOutcome = Result<(), (RunState, FlowError)>;

fn run_node(
    node: &Node,
    parameters: &ParameterStore,
    options: &RunOptions,
    catalog: &mut Option<Catalog>,
    env: &mut DataEnvironment,
    loaded: &mut usize,
) -> NodeOutcome {
    // Parameter bindings: a string binding naming a top-level store key
    // is substituted; everything else passes through literally.
    let mut resolved_params: Vec<(String, Value)> = Vec::with_capacity(node.parameters().len());
    for (arg, binding) in node.parameters() {
        let value = match binding {
            ParamValue::String(key) => match parameters.get(key) {
                Some(stored) => Value::Param(stored.clone()),
                None => Value::Param(binding.clone()),
            },
            other => Value::Param(other.clone()),
        };
        resolved_params.push((arg.clone(), value));
    }

    // Inputs: memory first, catalog on miss. Loaded values are bound back
    // into the environment for later nodes.
    let mut assembled: Vec<(String, Value)> = Vec::new();
    let mut from_memory: Vec<&str> = Vec::new();
    let mut from_catalog: Vec<&str> = Vec::new();
    let input_bindings = node.inputs().normalized();
    for (arg, data_ref) in &input_bindings {
        if !env.contains(data_ref) {
            let value = resolve_from_catalog(node, data_ref, options, catalog)
                .map_err(|e| (RunState::Resolving, e))?;
            env.insert(data_ref.clone(), value);
            *loaded += 1;
            from_catalog.push(data_ref);
        } else {
            from_memory.push(data_ref);
        }
        let value = env
            .get(data_ref)
            .cloned()
            .expect("input bound above");
        assembled.push((arg.clone(), value));
    }

    // Parameters shadow same-named inputs.
    for (arg, value) in resolved_params {
        if let Some(existing) = assembled.iter_mut().find(|(name, _)| *name == arg) {
            warn!(
                node = node.name(),
                argument = %arg,
                "parameter binding shadows an input of the same name"
            );
            existing.1 = value;
        } else {
            assembled.push((arg, value));
        }
    }

    // Match the assembled arguments against the declared signature.
    let signature = node.func().signature();
    let mut call_args: Vec<(String, Value)> = Vec::with_capacity(assembled.len());
    for formal in signature.formals() {
        match assembled.iter().find(|(name, _)| *name == formal.name) {
            Some((name, value)) => call_args.push((name.clone(), value.clone())),
            None => match &formal.default {
                Some(default) => call_args.push((formal.name.clone(), default.clone())),
                None => {
                    return Err((
                        RunState::Resolving,
                        FlowError::MissingArgument {
                            node: node.name().to_string(),
                            arg: formal.name.clone(),
                        },
                    ))
                }
            },
        }
    }
    for (name, value) in assembled {
        if signature.declares(&name) {
            continue;
        }
        if signature.is_variadic() {
            call_args.push((name, value));
        } else {
            warn!(
                node = node.name(),
                argument = %name,
                "dropping argument not declared by the node function"
            );
        }
    }

    let returned = node
        .func()
        .call(&ArgBag::new(call_args))
        .map_err(|e| match e {
            NodeError::Cancelled => (
                RunState::Executing,
                FlowError::Cancelled {
                    node: node.name().to_string(),
                },
            ),
            NodeError::Failed(message) => (
                RunState::Executing,
                FlowError::Node {
                    node: node.name().to_string(),
                    message,
                },
            ),
        })?;

    let stored = store_outputs(node, returned, env).map_err(|e| (RunState::Storing, e))?;

    info!(
        node = node.name(),
        inputs = %format!("mem:{from_memory:?} catalog:{from_catalog:?}"),
        outputs = ?stored,
        "node complete"
    );
    Ok(())
}

fn resolve_from_catalog(
    node: &Node,
    data_ref: &str,
    options: &RunOptions,
    catalog: &mut Option<Catalog>,
) -> Result<Value, FlowError> {
    let wrap = |source: FlowError| FlowError::InputResolution {
        node: node.name().to_string(),
        dataset: data_ref.to_string(),
        source: Box::new(source),
    };
    if catalog.is_none() {
        *catalog = Some(Catalog::load(&options.catalog_path).map_err(wrap)?);
    }
    let catalog = catalog.as_ref().expect("catalog loaded above");
    let entry = catalog.entry(data_ref).map_err(wrap)?;
    let table = datasource::load(&entry, &options.credentials_path).map_err(wrap)?;
    Ok(Value::Table(table))
}

/// Bind the function's return value per the node's output declaration.
/// Returns the stored data-set names.
fn store_outputs(
    node: &Node,
    returned: NodeReturn,
    env: &mut DataEnvironment,
) -> Result<Vec<String>, FlowError> {
    let single_target = match node.outputs() {
        Bindings::None => {
            return Ok(Vec::new());
        }
        Bindings::Single(name) => Some(name.clone()),
        Bindings::Seq(names) => names.first().cloned(),
        Bindings::Map(_) => None,
    };

    if let Some(target) = single_target {
        return match returned {
            NodeReturn::Empty => Ok(Vec::new()),
            NodeReturn::Single(value) => {
                env.insert(target.clone(), value);
                Ok(vec![target])
            }
            NodeReturn::Named(_) => Err(FlowError::Data(format!(
                "node `{}` returned a named mapping but declares the single output `{target}`",
                node.name()
            ))),
        };
    }

    let Bindings::Map(pairs) = node.outputs() else {
        unreachable!("single targets handled above");
    };
    match returned {
        NodeReturn::Empty => Ok(Vec::new()),
        NodeReturn::Single(_) => Err(FlowError::Data(format!(
            "node `{}` declares named outputs but returned a single value",
            node.name()
        ))),
        NodeReturn::Named(values) => {
            let mut stored = Vec::new();
            for (return_key, data_ref) in pairs {
                match values.iter().find(|(key, _)| key == return_key) {
                    Some((_, value)) => {
                        env.insert(data_ref.clone(), value.clone());
                        stored.push(data_ref.clone());
                    }
                    None => warn!(
                        node = node.name(),
                        return_key = %return_key,
                        "declared output key missing from the node's return value"
                    ),
                }
            }
            Ok(stored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::table::Table;
    use crate::pipeline::create_pipeline;
    use crate::pipeline::node::{create_node, NodeFunc, Signature};
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn options_without_catalog() -> RunOptions {
        RunOptions {
            catalog_path: PathBuf::from("/nonexistent/catalog.yaml"),
            credentials_path: PathBuf::from("/nonexistent/credentials.yaml"),
            ..RunOptions::default()
        }
    }

    fn table(rows: i64) -> Table {
        let values: Vec<i64> = (0..rows).collect();
        Table::from_columns(vec![(
            "v".to_string(),
            Arc::new(Int64Array::from(values)) as ArrayRef,
        )])
        .expect("table")
    }

    fn source_node(name: &str, output: &str, rows: i64) -> Node {
        let func = NodeFunc::new(name, Signature::new(), move |_| {
            Ok(NodeReturn::table(table(rows)))
        });
        create_node(func, Bindings::none(), Bindings::single(output)).expect("node")
    }

    #[test]
    fn parameter_bindings_resolve_against_the_store() {
        let func = NodeFunc::new("gen", Signature::new().arg("p").arg("q"), |args| {
            assert_eq!(args.param("p").unwrap().as_str(), Some("hello"));
            // Unmatched string bindings pass through literally.
            assert_eq!(args.param("q").unwrap().as_str(), Some("not.a.key"));
            Ok(NodeReturn::table(table(1)))
        });
        let node = create_node(func, Bindings::none(), Bindings::single("out"))
            .expect("node")
            .with_parameters([
                ("p", ParamValue::from("params.generation.setting")),
                ("q", ParamValue::from("not.a.key")),
            ])
            .expect("parameters");
        let parameters = ParameterStore::from_entries([(
            "params.generation.setting".to_string(),
            ParamValue::from("hello"),
        )]);

        let env = run_pipeline(
            &create_pipeline([node]),
            &parameters,
            &options_without_catalog(),
        )
        .expect("run");
        assert!(env.contains("out"));
    }

    #[test]
    fn non_string_parameter_bindings_pass_through() {
        let func = NodeFunc::new("gen", Signature::new().arg("n"), |args| {
            assert_eq!(args.param("n").unwrap().as_i64(), Some(3));
            Ok(NodeReturn::Empty)
        });
        let node = create_node(func, Bindings::none(), Bindings::none())
            .expect("node")
            .with_parameters([("n", ParamValue::from(3))])
            .expect("parameters");
        run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect("run");
    }

    #[test]
    fn memory_feeds_downstream_nodes_without_the_catalog() {
        let n1 = source_node("n1", "mid", 3);
        let func = NodeFunc::new("n2", Signature::new().arg("x"), |args| {
            let x = args.table("x")?;
            let c = Arc::new(Int64Array::from(vec![7; x.len()])) as ArrayRef;
            Ok(NodeReturn::table(
                x.with_column("c", c).map_err(|e| e.to_string())?,
            ))
        });
        let n2 = create_node(func, Bindings::map([("x", "mid")]), Bindings::single("final"))
            .expect("node");

        // The catalog path does not exist, so any catalog consultation
        // would abort the run.
        let env = run_pipeline(
            &create_pipeline([n1, n2]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect("run");
        assert!(env.contains("mid"));
        let final_table = env.get("final").and_then(Value::as_table).expect("final");
        assert!(final_table.has_column("c"));
    }

    #[test]
    fn seeded_values_take_precedence_over_the_catalog() {
        let func = NodeFunc::new("n", Signature::new().arg("d"), |args| {
            assert_eq!(args.table("d")?.len(), 2);
            Ok(NodeReturn::Empty)
        });
        let node =
            create_node(func, Bindings::map([("d", "raw")]), Bindings::none()).expect("node");
        let mut options = options_without_catalog();
        options.seed = vec![("raw".to_string(), Value::Table(table(2)))];
        run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options,
        )
        .expect("run");
    }

    #[test]
    fn missing_input_aborts_with_cause_chain() {
        let func = NodeFunc::new("n", Signature::new().arg("d"), |_| Ok(NodeReturn::Empty));
        let node =
            create_node(func, Bindings::map([("d", "raw")]), Bindings::none()).expect("node");
        let failure = run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect_err("failure");
        assert_eq!(failure.node, "n");
        assert_eq!(failure.state, RunState::Resolving);
        assert!(
            matches!(failure.error, FlowError::InputResolution { ref dataset, .. } if dataset == "raw"),
            "{}",
            failure.error
        );
    }

    #[test]
    fn missing_argument_names_node_and_argument() {
        let func = NodeFunc::new("needs", Signature::new().arg("x"), |_| Ok(NodeReturn::Empty));
        let node = create_node(func, Bindings::none(), Bindings::none()).expect("node");
        let failure = run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect_err("failure");
        assert!(
            matches!(failure.error, FlowError::MissingArgument { ref arg, .. } if arg == "x"),
            "{}",
            failure.error
        );
    }

    #[test]
    fn defaults_fill_unbound_formals() {
        let func = NodeFunc::new(
            "gen",
            Signature::new().arg_with_default("n", Value::Param(ParamValue::from(5))),
            |args| {
                assert_eq!(args.param("n").unwrap().as_i64(), Some(5));
                Ok(NodeReturn::Empty)
            },
        );
        let node = create_node(func, Bindings::none(), Bindings::none()).expect("node");
        run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect("run");
    }

    #[test]
    fn named_outputs_store_each_declared_key() {
        let func = NodeFunc::new("split", Signature::new(), |_| {
            Ok(NodeReturn::Named(vec![
                ("left".to_string(), Value::Table(table(1))),
                ("right".to_string(), Value::Table(table(2))),
                ("ignored".to_string(), Value::Table(table(9))),
            ]))
        });
        let node = create_node(
            func,
            Bindings::none(),
            Bindings::map([("left", "train"), ("right", "test"), ("absent", "extra")]),
        )
        .expect("node");
        let env = run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect("run");
        assert!(env.contains("train"));
        assert!(env.contains("test"));
        // A declared key missing from the return is a warning, not an error.
        assert!(!env.contains("extra"));
        // Returned keys with no declaration are dropped.
        assert!(!env.contains("ignored"));
    }

    #[test]
    fn named_return_against_single_output_is_an_error() {
        let func = NodeFunc::new("bad", Signature::new(), |_| {
            Ok(NodeReturn::Named(vec![(
                "k".to_string(),
                Value::Table(table(1)),
            )]))
        });
        let node = create_node(func, Bindings::none(), Bindings::single("out")).expect("node");
        let failure = run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect_err("failure");
        assert_eq!(failure.state, RunState::Storing);
    }

    #[test]
    fn empty_return_stores_nothing() {
        let func = NodeFunc::new("noop", Signature::new(), |_| Ok(NodeReturn::Empty));
        let node = create_node(func, Bindings::none(), Bindings::single("out")).expect("node");
        let env = run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect("run");
        assert!(env.is_empty());
    }

    #[test]
    fn cancellation_aborts_the_run() {
        let func = NodeFunc::new("halt", Signature::new(), |_| Err(NodeError::Cancelled));
        let node = create_node(func, Bindings::none(), Bindings::none()).expect("node");
        let failure = run_pipeline(
            &create_pipeline([source_node("first", "a", 1), node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect_err("failure");
        assert!(matches!(failure.error, FlowError::Cancelled { .. }));
        // Outputs of already-executed nodes survive in the partial env.
        assert!(failure.partial.contains("a"));
    }

    #[test]
    fn node_failure_keeps_partial_environment() {
        let func = NodeFunc::new("boom", Signature::new(), |_| {
            Err(NodeError::Failed("exploded".to_string()))
        });
        let node = create_node(func, Bindings::none(), Bindings::none()).expect("node");
        let failure = run_pipeline(
            &create_pipeline([source_node("first", "a", 1), node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect_err("failure");
        assert_eq!(failure.node, "boom");
        assert_eq!(failure.state, RunState::Executing);
        assert!(failure.partial.contains("a"));
        assert!(failure.to_string().contains("exploded"), "{failure}");
    }

    #[test]
    fn variadic_rest_receives_unmatched_arguments() {
        let func = NodeFunc::new("rest", Signature::new().arg("x").variadic(), |args| {
            assert!(args.contains("x"));
            assert!(args.contains("extra"));
            Ok(NodeReturn::Empty)
        });
        let node = create_node(func, Bindings::none(), Bindings::none())
            .expect("node")
            .with_parameters([
                ("x", ParamValue::from(1)),
                ("extra", ParamValue::from(2)),
            ])
            .expect("parameters");
        run_pipeline(
            &create_pipeline([node]),
            &ParameterStore::default(),
            &options_without_catalog(),
        )
        .expect("run");
    }
}
