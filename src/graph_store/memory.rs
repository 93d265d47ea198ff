use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CrawlerError, Result};
use crate::shared::{Namespace, NodeId, NodeType};

use super::{ExternalId, GraphStore, NewItem, Statement};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub label: Option<String>,
    pub description: Option<String>,
    pub external_ids: Vec<ExternalId>,
    pub statements: Vec<Statement>,
}

impl StoredNode {
    fn new(id: NodeId, node_type: NodeType, external_id: ExternalId) -> Self {
        StoredNode {
            id,
            node_type,
            label: None,
            description: None,
            external_ids: vec![external_id],
            statements: Vec::new(),
        }
    }

    fn upsert(&mut self, statement: &Statement) {
        match self
            .statements
            .iter_mut()
            .find(|existing| existing.key() == statement.key())
        {
            Some(existing) => *existing = statement.clone(),
            None => self.statements.push(statement.clone()),
        }
    }
}

/// Graph store held in process memory.
///
/// Used for dry runs and as the store double in tests. The node set can be
/// dumped as a JSON snapshot once a run is over.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    nodes: BTreeMap<NodeId, StoredNode>,
    index: HashMap<ExternalId, NodeId>,
    next_id: u64,
    creations: usize,
    edits: Vec<String>,
    closed: bool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-existing node, as a bootstrap would. Not counted as a creation.
    pub fn seed(&mut self, node_type: NodeType, id: ExternalId) -> NodeId {
        if let Some(&node) = self.index.get(&id) {
            return node;
        }
        self.insert(node_type, id)
    }

    pub fn with_node(mut self, node_type: NodeType, id: ExternalId) -> Self {
        self.seed(node_type, id);
        self
    }

    pub fn with_country(self, code: &str) -> Self {
        self.with_node(
            NodeType::Country,
            ExternalId::new(Namespace::CountryCode, code.to_uppercase()),
        )
    }

    pub fn node(&self, id: NodeId) -> Option<&StoredNode> {
        self.nodes.get(&id)
    }

    pub fn find(&self, id: &ExternalId) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    pub fn statements(&self, id: NodeId) -> &[Statement] {
        self.nodes
            .get(&id)
            .map(|node| node.statements.as_slice())
            .unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StoredNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn statement_count(&self) -> usize {
        self.nodes.values().map(|node| node.statements.len()).sum()
    }

    /// Number of creation requests served (bare nodes and items).
    pub fn creations(&self) -> usize {
        self.creations
    }

    /// Change summaries of every statement upsert, in order.
    pub fn edits(&self) -> &[String] {
        &self.edits
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let nodes: Vec<&StoredNode> = self.nodes.values().collect();
        fs::write(path, serde_json::to_string_pretty(&nodes)?)?;
        Ok(())
    }

    fn insert(&mut self, node_type: NodeType, id: ExternalId) -> NodeId {
        self.next_id += 1;
        let node = NodeId(self.next_id);
        self.index.insert(id.clone(), node);
        self.nodes.insert(node, StoredNode::new(node, node_type, id));
        node
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.closed {
            return Err(CrawlerError::store_write(operation, "store is closed"));
        }
        Ok(())
    }

    fn node_mut(&mut self, operation: &str, id: NodeId) -> Result<&mut StoredNode> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| CrawlerError::store_write(operation, format!("unknown node {}", id)))
    }
}

impl GraphStore for MemoryGraphStore {
    fn get_node(
        &mut self,
        node_type: NodeType,
        id: &ExternalId,
        create: bool,
    ) -> Result<Option<NodeId>> {
        if let Some(&node) = self.index.get(id) {
            return Ok(Some(node));
        }
        if !create {
            return Ok(None);
        }
        self.ensure_open("get_node")?;
        self.creations += 1;
        let node = self.insert(node_type, id.clone());
        debug!("created {} node {} for {}", node_type, node, id);
        Ok(Some(node))
    }

    fn add_item(&mut self, summary: &str, item: &NewItem) -> Result<NodeId> {
        self.ensure_open("add_item")?;
        if let Some(&existing) = self.index.get(&item.external_id) {
            return Err(CrawlerError::store_write(
                "add_item",
                format!("{} already carried by {}", item.external_id, existing),
            ));
        }
        self.creations += 1;
        let node = self.insert(item.node_type, item.external_id.clone());
        let stored = self.node_mut("add_item", node)?;
        stored.label = Some(item.label.clone());
        stored.description = item.description.clone();
        for statement in &item.statements {
            stored.upsert(statement);
        }
        self.edits.push(summary.to_string());
        Ok(node)
    }

    fn add_links(&mut self, source: NodeId, statements: &[Statement]) -> Result<()> {
        self.ensure_open("add_links")?;
        let stored = self.node_mut("add_links", source)?;
        for statement in statements {
            stored.upsert(statement);
        }
        Ok(())
    }

    fn upsert_statements(
        &mut self,
        summary: &str,
        node: NodeId,
        statements: &[Statement],
    ) -> Result<()> {
        self.ensure_open("upsert_statements")?;
        let stored = self.node_mut("upsert_statements", node)?;
        for statement in statements {
            stored.upsert(statement);
        }
        self.edits.push(summary.to_string());
        Ok(())
    }

    fn external_id_to_node(&mut self, namespace: Namespace) -> Result<HashMap<String, NodeId>> {
        Ok(self
            .index
            .iter()
            .filter(|(id, _)| id.namespace == namespace)
            .map(|(id, &node)| (id.value.clone(), node))
            .collect())
    }

    fn country_code_to_node(&mut self, code: &str) -> Result<Option<NodeId>> {
        let id = ExternalId::new(Namespace::CountryCode, code.trim().to_uppercase());
        Ok(self.index.get(&id).copied())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
