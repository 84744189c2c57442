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
pub mod node;
pub mod select;

use tracing::warn;

use crate::pipeline::node::Node;

/// An ordered, flat collection of nodes. Construction splices nested
/// pipelines in place, so no pipeline objects survive inside `nodes`.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    name: Option<String>,
    nodes: Vec<Node>,
}

impl Pipeline {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Pipeline {
        self.name = Some(name.into());
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One composable item: a node, or a pipeline whose nodes are spliced in.
#[derive(Debug, Clone)]
pub enum PipelineItem {
    Node(Node),
    Pipeline(Pipeline),
}

impl From<Node> for PipelineItem {
    fn from(node: Node) -> Self {
        PipelineItem::Node(node)
    }
}

impl From<Pipeline> for PipelineItem {
    fn from(pipeline: Pipeline) -> Self {
        PipelineItem::Pipeline(pipeline)
    }
}

/// Compose nodes and pipelines into one flat pipeline, preserving order.
/// Duplicate node names are allowed but warned about; no DAG check runs
/// here, so inputs missing from the catalog surface at run time.
pub fn create_pipeline<I>(items: I) -> Pipeline
where
    I: IntoIterator,
    I::Item: Into<PipelineItem>,
{
    let mut nodes = Vec::new();
    for item in items {
        match item.into() {
            PipelineItem::Node(node) => nodes.push(node),
            PipelineItem::Pipeline(pipeline) => nodes.extend(pipeline.nodes),
        }
    }

    let duplicates = duplicate_names(&nodes);
    if !duplicates.is_empty() {
        warn!(
            "pipeline contains duplicate node names: {}",
            duplicates.join(", ")
        );
    }

    Pipeline { name: None, nodes }
}

/// Names appearing more than once, each reported once, in discovery order.
pub(crate) fn duplicate_names(nodes: &[Node]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut duplicates = Vec::new();
    for node in nodes {
        if !seen.insert(node.name()) && !duplicates.iter().any(|d| d == node.name()) {
            duplicates.push(node.name().to_string());
        }
    }
    duplicates
}
