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
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{FlowError, FlowResult, NodeError};
use crate::exec::value::{ArgBag, NodeReturn, ParamValue, Value};

/// A declared formal parameter of a node function.
#[derive(Debug, Clone)]
pub struct Formal {
    pub name: String,
    pub default: Option<Value>,
}

/// The declared calling surface of a node function: formal parameter
/// names (with optional defaults) and whether unmatched arguments are
/// accepted as a variadic rest.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    formals: Vec<Formal>,
    variadic: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.formals.push(Formal {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn arg_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.formals.push(Formal {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn formals(&self) -> &[Formal] {
        &self.formals
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn declares(&self, name: &str) -> bool {
        self.formals.iter().any(|formal| formal.name == name)
    }
}

pub type NodeBody = Arc<dyn Fn(&ArgBag) -> Result<NodeReturn, NodeError> + Send + Sync>;

/// A named callable with a declared signature. Stands in for function
/// reflection: the runner matches call arguments against `signature`.
#[derive(Clone)]
pub struct NodeFunc {
    name: String,
    signature: Signature,
    body: NodeBody,
}

impl NodeFunc {
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        body: impl Fn(&ArgBag) -> Result<NodeReturn, NodeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn call(&self, args: &ArgBag) -> Result<NodeReturn, NodeError> {
        (self.body)(args)
    }
}

impl fmt::Debug for NodeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFunc")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Input/output binding surface forms, preserved verbatim on the node.
/// A bare name binds the data set under its own name; a mapping binds
/// argument (or return-key) to data-set name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bindings {
    None,
    Single(String),
    Seq(Vec<String>),
    Map(Vec<(String, String)>),
}

impl Bindings {
    pub fn none() -> Self {
        Bindings::None
    }

    pub fn single(name: impl Into<String>) -> Self {
        Bindings::Single(name.into())
    }

    pub fn seq<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Bindings::Seq(names.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Bindings::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Bindings::None)
    }

    /// Ordered (argument name, data-set name) pairs; bare names use the
    /// data-set name as the argument name.
    pub(crate) fn normalized(&self) -> Vec<(String, String)> {
        match self {
            Bindings::None => Vec::new(),
            Bindings::Single(name) => vec![(name.clone(), name.clone())],
            Bindings::Seq(names) => names.iter().map(|n| (n.clone(), n.clone())).collect(),
            Bindings::Map(pairs) => pairs.clone(),
        }
    }

    fn data_refs(&self) -> Vec<&str> {
        match self {
            Bindings::None => Vec::new(),
            Bindings::Single(name) => vec![name.as_str()],
            Bindings::Seq(names) => names.iter().map(|n| n.as_str()).collect(),
            Bindings::Map(pairs) => pairs.iter().map(|(_, v)| v.as_str()).collect(),
        }
    }
}

impl From<&str> for Bindings {
    fn from(name: &str) -> Self {
        Bindings::Single(name.to_string())
    }
}

/// Immutable descriptor binding a function to named inputs, outputs,
/// parameter bindings and tags.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    func: NodeFunc,
    inputs: Bindings,
    outputs: Bindings,
    parameters: Vec<(String, ParamValue)>,
    tags: BTreeSet<String>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn func(&self) -> &NodeFunc {
        &self.func
    }

    pub fn inputs(&self) -> &Bindings {
        &self.inputs
    }

    pub fn outputs(&self) -> &Bindings {
        &self.outputs
    }

    pub fn parameters(&self) -> &[(String, ParamValue)] {
        &self.parameters
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Rename the node. The name must stay non-empty.
    pub fn with_name(mut self, name: impl Into<String>) -> FlowResult<Node> {
        self.name = name.into();
        self.validate()?;
        Ok(self)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Node
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Bind function arguments to parameter values or Parameter Store
    /// keys. String bindings that match a top-level store key are
    /// substituted at run time; everything else passes through literally.
    pub fn with_parameters<I, K>(mut self, parameters: I) -> FlowResult<Node>
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: Into<String>,
    {
        self.parameters = parameters
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> FlowResult<()> {
        if self.name.is_empty() {
            return Err(FlowError::InvalidNode(
                "node name must not be empty".to_string(),
            ));
        }
        for data_ref in self.inputs.data_refs().iter().chain(self.outputs.data_refs().iter()) {
            if data_ref.is_empty() {
                return Err(FlowError::InvalidNode(format!(
                    "node `{}` has an empty data set name",
                    self.name
                )));
            }
        }
        if let Bindings::Seq(names) = &self.outputs {
            if names.len() != 1 {
                return Err(FlowError::InvalidNode(format!(
                    "node `{}`: an output sequence must contain exactly one data set name",
                    self.name
                )));
            }
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let input_args = self.inputs.normalized();
        for (arg, _) in &input_args {
            if arg.is_empty() {
                return Err(FlowError::InvalidNode(format!(
                    "node `{}` has an empty argument name",
                    self.name
                )));
            }
            if !seen.insert(arg.as_str()) {
                return Err(FlowError::InvalidNode(format!(
                    "node `{}` binds argument `{arg}` more than once",
                    self.name
                )));
            }
        }
        for (arg, _) in &self.parameters {
            if arg.is_empty() {
                return Err(FlowError::InvalidNode(format!(
                    "node `{}` has an empty argument name",
                    self.name
                )));
            }
            if !seen.insert(arg.as_str()) {
                return Err(FlowError::InvalidNode(format!(
                    "node `{}` binds argument `{arg}` both as input and parameter",
                    self.name
                )));
            }
        }

        let signature = self.func.signature();
        if !signature.is_variadic() {
            for arg in seen {
                if !signature.declares(arg) {
                    return Err(FlowError::InvalidNode(format!(
                        "node `{}` binds argument `{arg}` which `{}` does not declare",
                        self.name,
                        self.func.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Build a node. The name defaults to the function's name; tags and
/// parameters start empty.
pub fn create_node(func: NodeFunc, inputs: Bindings, outputs: Bindings) -> FlowResult<Node> {
    let node = Node {
        name: func.name().to_string(),
        func,
        inputs,
        outputs,
        parameters: Vec::new(),
        tags: BTreeSet::new(),
    };
    node.validate()?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_func(args: &[&str]) -> NodeFunc {
        let mut signature = Signature::new();
        for arg in args {
            signature = signature.arg(*arg);
        }
        NodeFunc::new("identity", signature, |_| Ok(NodeReturn::Empty))
    }

    #[test]
    fn name_defaults_to_function_name() {
        let node = create_node(identity_func(&[]), Bindings::none(), Bindings::none())
            .expect("node");
        assert_eq!(node.name(), "identity");
        let renamed = node.with_name("gen").expect("rename");
        assert_eq!(renamed.name(), "gen");
    }

    #[test]
    fn empty_name_is_invalid() {
        let node = create_node(identity_func(&[]), Bindings::none(), Bindings::none())
            .expect("node");
        let err = node.with_name("").expect_err("empty name");
        assert!(matches!(err, FlowError::InvalidNode(_)), "{err}");
    }

    #[test]
    fn empty_data_ref_is_invalid() {
        let err = create_node(
            identity_func(&["x"]),
            Bindings::map([("x", "")]),
            Bindings::none(),
        )
        .expect_err("empty ref");
        assert!(err.to_string().contains("empty data set name"), "{err}");
    }

    #[test]
    fn input_and_parameter_argument_names_must_be_disjoint() {
        let node = create_node(
            identity_func(&["x"]),
            Bindings::map([("x", "raw")]),
            Bindings::none(),
        )
        .expect("node");
        let err = node
            .with_parameters([("x", ParamValue::from(1))])
            .expect_err("collision");
        assert!(
            err.to_string().contains("both as input and parameter"),
            "{err}"
        );
    }

    #[test]
    fn arguments_must_resolve_against_the_signature() {
        let err = create_node(
            identity_func(&["x"]),
            Bindings::map([("y", "raw")]),
            Bindings::none(),
        )
        .expect_err("unknown argument");
        assert!(err.to_string().contains("does not declare"), "{err}");
    }

    #[test]
    fn variadic_signatures_accept_any_argument() {
        let func = NodeFunc::new("collect", Signature::new().variadic(), |_| {
            Ok(NodeReturn::Empty)
        });
        let node = create_node(func, Bindings::map([("whatever", "raw")]), Bindings::none());
        assert!(node.is_ok());
    }

    #[test]
    fn bare_inputs_bind_under_their_own_name() {
        let node = create_node(
            identity_func(&["raw", "lookup"]),
            Bindings::seq(["raw", "lookup"]),
            Bindings::none(),
        )
        .expect("node");
        assert_eq!(
            node.inputs().normalized(),
            vec![
                ("raw".to_string(), "raw".to_string()),
                ("lookup".to_string(), "lookup".to_string()),
            ]
        );
    }

    #[test]
    fn output_sequence_must_be_single() {
        let func = identity_func(&[]);
        let err = create_node(func, Bindings::none(), Bindings::seq(["a", "b"]))
            .expect_err("two outputs");
        assert!(err.to_string().contains("exactly one"), "{err}");
    }
}
