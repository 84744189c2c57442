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
use tracing::warn;

use crate::pipeline::node::Node;
use crate::pipeline::Pipeline;

/// Which nodes of a pipeline to run. Filters compose in a fixed order:
/// tags first, then either explicit names (which take precedence over the
/// range fields) or the from/to range. The original node order is never
/// changed.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub tags: Vec<String>,
    pub node_names: Vec<String>,
    pub from_nodes: Vec<String>,
    pub to_nodes: Vec<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.node_names.is_empty()
            && self.from_nodes.is_empty()
            && self.to_nodes.is_empty()
    }
}

/// Reduce a pipeline's node list to the selected subsequence.
pub fn select(pipeline: &Pipeline, selection: &Selection) -> Vec<Node> {
    select_nodes(pipeline.nodes(), selection)
}

pub fn select_nodes(nodes: &[Node], selection: &Selection) -> Vec<Node> {
    let current: Vec<&Node> = if selection.tags.is_empty() {
        nodes.iter().collect()
    } else {
        nodes
            .iter()
            .filter(|node| selection.tags.iter().any(|tag| node.tags().contains(tag)))
            .collect()
    };

    if !selection.node_names.is_empty() {
        if !selection.from_nodes.is_empty() || !selection.to_nodes.is_empty() {
            warn!("node names are set; ignoring from/to node filters");
        }
        return current
            .into_iter()
            .filter(|node| selection.node_names.iter().any(|name| name == node.name()))
            .cloned()
            .collect();
    }

    if current.is_empty() {
        if !selection.from_nodes.is_empty() || !selection.to_nodes.is_empty() {
            warn!("from/to node filters matched nothing");
        }
        return Vec::new();
    }

    let start = if selection.from_nodes.is_empty() {
        0
    } else {
        match current
            .iter()
            .position(|node| selection.from_nodes.iter().any(|name| name == node.name()))
        {
            Some(idx) => idx,
            None => {
                warn!(
                    "none of the from nodes {:?} are present; selecting nothing",
                    selection.from_nodes
                );
                return Vec::new();
            }
        }
    };
    let end = if selection.to_nodes.is_empty() {
        current.len() - 1
    } else {
        match current
            .iter()
            .rposition(|node| selection.to_nodes.iter().any(|name| name == node.name()))
        {
            Some(idx) => idx,
            None => {
                warn!(
                    "none of the to nodes {:?} are present; selecting nothing",
                    selection.to_nodes
                );
                return Vec::new();
            }
        }
    };
    if start > end {
        return Vec::new();
    }
    current[start..=end].iter().map(|node| (*node).clone()).collect()
}
