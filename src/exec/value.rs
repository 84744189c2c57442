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
use crate::error::NodeError;
use crate::exec::table::Table;

/// Parameter values are the untyped tree a parameters document parses to:
/// null, bool, number, string, sequence or mapping.
pub type ParamValue = serde_yaml::Value;

/// A value bound in the run-local data environment or passed to a node:
/// either tabular data or a parameter tree.
#[derive(Debug, Clone)]
pub enum Value {
    Table(Table),
    Param(ParamValue),
}

impl Value {
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            Value::Param(_) => None,
        }
    }

    pub fn as_param(&self) -> Option<&ParamValue> {
        match self {
            Value::Param(value) => Some(value),
            Value::Table(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Param(ParamValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::Table(table)
    }
}

impl From<ParamValue> for Value {
    fn from(value: ParamValue) -> Self {
        Value::Param(value)
    }
}

/// What a node body hands back to the runner.
#[derive(Debug, Clone)]
pub enum NodeReturn {
    /// One value, stored under the node's single output name.
    Single(Value),
    /// Named sub-values, matched against a named-mapping output declaration.
    Named(Vec<(String, Value)>),
    /// Nothing to store.
    Empty,
}

impl NodeReturn {
    pub fn table(table: Table) -> Self {
        NodeReturn::Single(Value::Table(table))
    }
}

/// The matched call arguments handed to a node body, keyed by the
/// function's formal parameter names. Order follows the signature.
#[derive(Debug, Clone, Default)]
pub struct ArgBag {
    args: Vec<(String, Value)>,
}

impl ArgBag {
    pub(crate) fn new(args: Vec<(String, Value)>) -> Self {
        Self { args }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.args.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// The argument as a table, or a node failure naming the argument.
    pub fn table(&self, name: &str) -> Result<&Table, NodeError> {
        match self.get(name) {
            Some(Value::Table(table)) => Ok(table),
            Some(Value::Param(_)) => Err(NodeError::Failed(format!(
                "argument `{name}` is a parameter, not a table"
            ))),
            None => Err(NodeError::Failed(format!("argument `{name}` not supplied"))),
        }
    }

    /// The argument as a parameter value, or a node failure naming it.
    pub fn param(&self, name: &str) -> Result<&ParamValue, NodeError> {
        match self.get(name) {
            Some(Value::Param(value)) => Ok(value),
            Some(Value::Table(_)) => Err(NodeError::Failed(format!(
                "argument `{name}` is a table, not a parameter"
            ))),
            None => Err(NodeError::Failed(format!("argument `{name}` not supplied"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_bag_lookup() {
        let bag = ArgBag::new(vec![
            (
                "p".to_string(),
                Value::Param(ParamValue::String("hello".into())),
            ),
            ("t".to_string(), Value::Table(Table::default())),
        ]);
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.param("p").unwrap().as_str(), Some("hello"));
        assert!(bag.table("t").is_ok());
        assert!(bag.table("p").is_err());
        assert!(bag.param("missing").is_err());
    }
}
