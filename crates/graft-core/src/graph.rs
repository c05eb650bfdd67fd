//! In-memory computation graphs handed to execution providers.
//!
//! A [`Graph`] is immutable once built and host-owned: providers see it
//! read-only during capability reporting and compilation. Construction goes
//! through [`GraphBuilder`], which validates that:
//! - node and value names are unique within the graph,
//! - every name a node references is declared,
//! - nodes are listed in topological order (producers before consumers).

use std::collections::{HashMap, HashSet};

use crate::error::{ProviderError, Result};
use crate::tensor::{DataType, Tensor};

/// One dimension of a tensor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Extent known at graph-build time.
    Static(usize),
    /// Extent unknown until run time.
    Dynamic,
}

impl Dimension {
    /// The static extent, or `None` for a dynamic dimension.
    pub fn as_static(&self) -> Option<usize> {
        match self {
            Dimension::Static(extent) => Some(*extent),
            Dimension::Dynamic => None,
        }
    }
}

/// Metadata describing one named value in a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInfo {
    /// Name unique within the graph.
    pub name: String,
    /// Element type of the value.
    pub dtype: DataType,
    /// Per-dimension extents; `None` when shape metadata is unavailable.
    pub shape: Option<Vec<Dimension>>,
    /// Whether the value is a compile-time constant ("initializer").
    pub constant: bool,
    /// Whether the constant may be omitted from runtime inputs.
    pub dropped: bool,
}

impl ValueInfo {
    /// Create metadata for a non-constant value.
    pub fn new(name: impl Into<String>, dtype: DataType, shape: Option<Vec<Dimension>>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
            constant: false,
            dropped: false,
        }
    }

    /// Whether this value is a compile-time constant.
    pub fn is_constant_initializer(&self) -> bool {
        self.constant
    }

    /// Whether this value is a constant the host may omit from runtime inputs.
    pub fn is_dropped_constant_initializer(&self) -> bool {
        self.constant && self.dropped
    }

    /// All dimensions as static extents, or `None` if the shape is missing
    /// or any dimension is dynamic.
    pub fn static_dims(&self) -> Option<Vec<usize>> {
        let shape = self.shape.as_ref()?;
        shape.iter().map(Dimension::as_static).collect()
    }
}

/// One operator invocation in a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Operator type, e.g. `"Mul"`.
    pub op_type: String,
    /// Name unique within the graph.
    pub name: String,
    /// Ordered input value names.
    pub inputs: Vec<String>,
    /// Ordered output value names.
    pub outputs: Vec<String>,
}

impl Node {
    /// Create a node.
    pub fn new(
        op_type: impl Into<String>,
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            op_type: op_type.into(),
            name: name.into(),
            inputs,
            outputs,
        }
    }
}

/// An immutable, validated computation graph.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    values: HashMap<String, ValueInfo>,
    initializers: HashMap<String, Tensor>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl Graph {
    /// Name of the graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in topological order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Look up value metadata by name.
    pub fn value(&self, name: &str) -> Option<&ValueInfo> {
        self.values.get(name)
    }

    /// Iterate over all value metadata.
    pub fn values(&self) -> impl Iterator<Item = &ValueInfo> {
        self.values.values()
    }

    /// Tensor data of a constant initializer, if the value is one.
    pub fn initializer(&self, name: &str) -> Option<&Tensor> {
        self.initializers.get(name)
    }

    /// Graph input value names (runtime-supplied values).
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Graph output value names.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Extract the named nodes into a standalone graph, carrying over the
    /// value metadata and constant tensors they reference.
    ///
    /// With `drop_constant_initializers` set, every constant in the extracted
    /// graph is marked as omitted from runtime inputs. Subgraph inputs are the
    /// values the selected nodes consume but do not produce, minus dropped
    /// constants; subgraph outputs are the values they produce.
    pub fn extract_subgraph(
        &self,
        node_names: &[String],
        drop_constant_initializers: bool,
    ) -> Result<Graph> {
        let wanted: HashSet<&str> = node_names.iter().map(String::as_str).collect();
        for name in node_names {
            if self.node(name).is_none() {
                return Err(ProviderError::invalid_argument(format!(
                    "graph '{}' has no node named '{}'",
                    self.name, name
                )));
            }
        }

        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|node| wanted.contains(node.name.as_str()))
            .cloned()
            .collect();

        let mut values = HashMap::new();
        let mut initializers = HashMap::new();
        for node in &nodes {
            for value_name in node.inputs.iter().chain(node.outputs.iter()) {
                if let Some(info) = self.values.get(value_name) {
                    let mut info = info.clone();
                    if info.is_constant_initializer() {
                        if drop_constant_initializers {
                            info.dropped = true;
                        }
                        if let Some(tensor) = self.initializers.get(value_name) {
                            initializers.insert(value_name.clone(), tensor.clone());
                        }
                    }
                    values.insert(value_name.clone(), info);
                }
            }
        }

        let produced: HashSet<&str> = nodes
            .iter()
            .flat_map(|node| node.outputs.iter())
            .map(String::as_str)
            .collect();

        let mut inputs = Vec::new();
        let mut seen = HashSet::new();
        for node in &nodes {
            for input in &node.inputs {
                if produced.contains(input.as_str()) || !seen.insert(input.clone()) {
                    continue;
                }
                let dropped = values
                    .get(input)
                    .map(ValueInfo::is_dropped_constant_initializer)
                    .unwrap_or(false);
                if !dropped {
                    inputs.push(input.clone());
                }
            }
        }

        let consumed_inside: HashSet<&str> = nodes
            .iter()
            .flat_map(|node| node.inputs.iter())
            .map(String::as_str)
            .collect();
        let outputs: Vec<String> = nodes
            .iter()
            .flat_map(|node| node.outputs.iter())
            .filter(|output| !consumed_inside.contains(output.as_str()))
            .cloned()
            .collect();

        Ok(Graph {
            name: format!("{}_fused", self.name),
            nodes,
            values,
            initializers,
            inputs,
            outputs,
        })
    }
}

/// Builder for [`Graph`] instances.
///
/// Declare values first, then add nodes in execution order, then build.
pub struct GraphBuilder {
    name: String,
    nodes: Vec<Node>,
    values: Vec<ValueInfo>,
    initializers: HashMap<String, Tensor>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl GraphBuilder {
    /// Start building a graph with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            values: Vec::new(),
            initializers: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declare a value with a fully static shape.
    pub fn add_value(&mut self, name: &str, dtype: DataType, dims: &[usize]) -> &mut Self {
        let shape = Some(dims.iter().map(|&d| Dimension::Static(d)).collect());
        self.values.push(ValueInfo::new(name, dtype, shape));
        self
    }

    /// Declare a value with an arbitrary (possibly dynamic or missing) shape.
    pub fn add_dynamic_value(
        &mut self,
        name: &str,
        dtype: DataType,
        shape: Option<Vec<Dimension>>,
    ) -> &mut Self {
        self.values.push(ValueInfo::new(name, dtype, shape));
        self
    }

    /// Declare a constant initializer backed by the given tensor.
    ///
    /// The value's element type and static shape are taken from the tensor.
    pub fn add_initializer(&mut self, name: &str, tensor: Tensor) -> &mut Self {
        self.push_initializer(name, tensor, false)
    }

    /// Declare a constant initializer the host may omit from runtime inputs.
    pub fn add_dropped_initializer(&mut self, name: &str, tensor: Tensor) -> &mut Self {
        self.push_initializer(name, tensor, true)
    }

    fn push_initializer(&mut self, name: &str, tensor: Tensor, dropped: bool) -> &mut Self {
        let shape = Some(tensor.shape().iter().map(|&d| Dimension::Static(d)).collect());
        let mut info = ValueInfo::new(name, tensor.dtype(), shape);
        info.constant = true;
        info.dropped = dropped;
        self.values.push(info);
        self.initializers.insert(name.to_string(), tensor);
        self
    }

    /// Append a node. Nodes must be added in execution order.
    pub fn add_node(
        &mut self,
        op_type: &str,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> &mut Self {
        self.nodes.push(Node::new(
            op_type,
            name,
            inputs.iter().map(|s| s.to_string()).collect(),
            outputs.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Set graph inputs.
    pub fn set_inputs(&mut self, names: &[&str]) -> &mut Self {
        self.inputs = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set graph outputs.
    pub fn set_outputs(&mut self, names: &[&str]) -> &mut Self {
        self.outputs = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Validate and build the final graph.
    pub fn build(self) -> Result<Graph> {
        let mut values = HashMap::new();
        for info in self.values {
            if info.dropped && !info.constant {
                return Err(ProviderError::invalid_argument(format!(
                    "value '{}' is marked dropped but is not a constant initializer",
                    info.name
                )));
            }
            let name = info.name.clone();
            if values.insert(name.clone(), info).is_some() {
                return Err(ProviderError::invalid_argument(format!(
                    "duplicate value '{}' in graph '{}'",
                    name, self.name
                )));
            }
        }

        for (name, info) in &values {
            if !info.constant {
                continue;
            }
            let Some(tensor) = self.initializers.get(name) else {
                return Err(ProviderError::invalid_argument(format!(
                    "constant value '{name}' has no initializer tensor"
                )));
            };
            if tensor.dtype() != info.dtype {
                return Err(ProviderError::invalid_argument(format!(
                    "initializer '{name}' tensor type {:?} does not match declared type {:?}",
                    tensor.dtype(),
                    info.dtype
                )));
            }
            if info.static_dims().as_deref() != Some(tensor.shape()) {
                return Err(ProviderError::invalid_argument(format!(
                    "initializer '{name}' tensor shape {:?} does not match declared shape",
                    tensor.shape()
                )));
            }
        }

        let mut node_names = HashSet::new();
        for node in &self.nodes {
            if !node_names.insert(node.name.as_str()) {
                return Err(ProviderError::invalid_argument(format!(
                    "duplicate node name '{}' in graph '{}'",
                    node.name, self.name
                )));
            }
        }

        for name in self.inputs.iter().chain(self.outputs.iter()) {
            if !values.contains_key(name) {
                return Err(ProviderError::invalid_argument(format!(
                    "graph '{}' lists undeclared value '{}' as an input or output",
                    self.name, name
                )));
            }
        }

        // Topological-order walk: a node may only consume graph inputs,
        // constants, or outputs of earlier nodes.
        let mut available: HashSet<&str> = self.inputs.iter().map(String::as_str).collect();
        available.extend(
            values
                .values()
                .filter(|info| info.constant)
                .map(|info| info.name.as_str()),
        );
        let mut producers: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            for input in &node.inputs {
                if !values.contains_key(input) {
                    return Err(ProviderError::invalid_argument(format!(
                        "node '{}' references undeclared value '{}'",
                        node.name, input
                    )));
                }
                if !available.contains(input.as_str()) {
                    return Err(ProviderError::invalid_argument(format!(
                        "node '{}' consumes value '{}' before it is produced",
                        node.name, input
                    )));
                }
            }
            for output in &node.outputs {
                if !values.contains_key(output) {
                    return Err(ProviderError::invalid_argument(format!(
                        "node '{}' references undeclared value '{}'",
                        node.name, output
                    )));
                }
                if !producers.insert(output.as_str()) {
                    return Err(ProviderError::invalid_argument(format!(
                        "value '{}' is produced by more than one node",
                        output
                    )));
                }
                available.insert(output.as_str());
            }
        }

        Ok(Graph {
            name: self.name,
            nodes: self.nodes,
            values,
            initializers: self.initializers,
            inputs: self.inputs,
            outputs: self.outputs,
        })
    }
}
