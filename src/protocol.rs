//! Wire types for the `/solve` endpoint.
//!
//! Request:  `{ "definition": "LEAF.gh", "inputs": { "RH_IN:X coordinate": 12.0, ... } }`
//! Response: `{ "values": [ { "InnerTree": { "{0}": [ { "type": ..., "data": ... } ] } } ] }`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Type tag of branch items carrying a string (encoded mesh) payload.
pub const STRING_ITEM_TAG: &str = "System.String";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    definition: String,
    inputs: IndexMap<String, f64>,
}

impl SolveRequest {
    pub fn new<I, K>(definition: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            definition: definition.into(),
            inputs: inputs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn inputs(&self) -> &IndexMap<String, f64> {
        &self.inputs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    #[serde(default)]
    pub values: Vec<SolveOutput>,
}

/// One output parameter of the solved definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveOutput {
    #[serde(rename = "ParamName", default, skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
    #[serde(rename = "InnerTree", default)]
    pub inner_tree: InnerTree,
}

/// Branch path -> items, in the order the server sent them.
pub type InnerTree = IndexMap<String, Vec<BranchItem>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchItem {
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON text; a quoted string for string items, an object for geometry.
    pub data: String,
}

impl BranchItem {
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self { kind: kind.into(), data: data.into() }
    }

    pub fn is_string(&self) -> bool {
        self.kind == STRING_ITEM_TAG
    }
}

impl SolveResponse {
    /// All items in response order: outputs, then branches, then items.
    pub fn items(&self) -> impl Iterator<Item = &BranchItem> {
        self.values
            .iter()
            .flat_map(|out| out.inner_tree.values())
            .flatten()
    }
}
