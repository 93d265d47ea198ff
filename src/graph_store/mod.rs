pub mod memory;
pub mod neo4j;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reference::Reference;
use crate::shared::{Class, Namespace, NodeId, NodeType, Relation, Relationships};

pub use memory::MemoryGraphStore;
pub use neo4j::{Neo4jConfig, Neo4jGraphStore};

/// An identifier defined by an upstream data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId {
    pub namespace: Namespace,
    pub value: String,
}

impl ExternalId {
    pub fn new(namespace: Namespace, value: impl Into<String>) -> Self {
        ExternalId {
            namespace,
            value: value.into(),
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.namespace, self.value)
    }
}

/// Target of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Node(NodeId),
    Class(Class),
    Literal(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Node(id) => write!(f, "{}", id),
            Value::Class(class) => write!(f, "{}", class),
            Value::Literal(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    InstanceOf(Class),
    Relationship(Relationships),
}

impl Qualifier {
    pub fn key(&self) -> &'static str {
        match self {
            Qualifier::InstanceOf(_) => "qualifier_instance_of",
            Qualifier::Relationship(_) => "rel",
        }
    }

    /// Identifying qualifiers tell apart statements with the same relation
    /// and target. The others are plain edge properties.
    pub fn is_identifying(&self) -> bool {
        matches!(self, Qualifier::InstanceOf(_))
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::InstanceOf(class) => write!(f, "{}={}", self.key(), class),
            Qualifier::Relationship(rel) => write!(f, "{}={}", self.key(), rel),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub relation: Relation,
    pub target: Value,
    pub reference: Reference,
    pub qualifiers: Vec<Qualifier>,
}

impl Statement {
    pub fn new(relation: Relation, target: Value, reference: &Reference) -> Self {
        Statement {
            relation,
            target,
            reference: reference.clone(),
            qualifiers: Vec::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// Statements sharing a key replace each other on upsert.
    pub fn key(&self) -> (Relation, &Value, Vec<&Qualifier>) {
        let qualifiers = self
            .qualifiers
            .iter()
            .filter(|qualifier| qualifier.is_identifying())
            .collect();
        (self.relation, &self.target, qualifiers)
    }

    /// Identifying qualifiers in a stable text form, empty when there are none.
    pub fn identity(&self) -> String {
        let mut parts: Vec<String> = self
            .qualifiers
            .iter()
            .filter(|qualifier| qualifier.is_identifying())
            .map(Qualifier::to_string)
            .collect();
        parts.sort();
        parts.join(",")
    }
}

/// A node created together with its label, description and first statements.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub node_type: NodeType,
    pub external_id: ExternalId,
    pub label: String,
    pub description: Option<String>,
    pub statements: Vec<Statement>,
}

/// The property graph the crawlers write into.
///
/// Implementations must keep external identifiers unique per namespace and
/// treat statement writes as upserts keyed by `Statement::key`.
pub trait GraphStore {
    /// Find the node carrying `id`, creating it when `create` is set.
    fn get_node(&mut self, node_type: NodeType, id: &ExternalId, create: bool)
        -> Result<Option<NodeId>>;

    /// Create a labelled node and attach its initial statements.
    fn add_item(&mut self, summary: &str, item: &NewItem) -> Result<NodeId>;

    fn add_links(&mut self, source: NodeId, statements: &[Statement]) -> Result<()>;

    fn upsert_statements(
        &mut self,
        summary: &str,
        node: NodeId,
        statements: &[Statement],
    ) -> Result<()>;

    /// All known identifiers of a namespace and the nodes carrying them.
    fn external_id_to_node(&mut self, namespace: Namespace) -> Result<HashMap<String, NodeId>>;

    fn country_code_to_node(&mut self, code: &str) -> Result<Option<NodeId>>;

    /// Release the connection. The store must not be used afterwards.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
