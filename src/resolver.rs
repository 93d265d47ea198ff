use std::collections::{HashMap, HashSet};

use ipnetwork::IpNetwork;
use tracing::debug;

use crate::error::{CrawlerError, Result};
use crate::graph_store::{ExternalId, GraphStore, NewItem};
use crate::shared::{Namespace, NodeId, NodeType};

/// Maps external identifiers onto graph nodes for the duration of a run.
///
/// Every answer, whether found in the store or freshly created, is cached, so
/// a repeated `(namespace, value)` never reaches the store twice.
#[derive(Debug, Default)]
pub struct IdentifierResolver {
    cache: HashMap<Namespace, HashMap<String, NodeId>>,
    preloaded: HashSet<Namespace>,
}

/// Canonical form of an identifier value, or an error when it cannot name a node.
pub fn normalize(namespace: Namespace, value: &str) -> Result<String> {
    let value = value.trim();
    let invalid = |message: &str| CrawlerError::InvalidIdentifier {
        namespace,
        value: value.to_string(),
        message: message.to_string(),
    };
    if value.is_empty() {
        return Err(invalid("empty value"));
    }
    match namespace {
        Namespace::CountryCode => Ok(value.to_uppercase()),
        Namespace::Prefix => {
            let network: IpNetwork = value.parse().map_err(|_| invalid("not an IP prefix"))?;
            let canonical = IpNetwork::new(network.network(), network.prefix())
                .map_err(|_| invalid("not an IP prefix"))?;
            Ok(canonical.to_string())
        }
        Namespace::Asn => {
            let asn = value
                .trim_start_matches("AS")
                .parse::<u32>()
                .map_err(|_| invalid("not an AS number"))?;
            Ok(asn.to_string())
        }
        Namespace::PeeringdbIxId | Namespace::PeeringdbOrgId => Ok(value.to_string()),
    }
}

impl IdentifierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load every known identifier of `namespace`.
    ///
    /// Afterwards a cache miss in that namespace means the node does not
    /// exist, and no per-value lookup is sent to the store.
    pub fn preload<S: GraphStore + ?Sized>(&mut self, store: &mut S, namespace: Namespace) -> Result<usize> {
        let mapping = store.external_id_to_node(namespace)?;
        let count = mapping.len();
        let entries = self.cache.entry(namespace).or_default();
        for (value, node) in mapping {
            match normalize(namespace, &value) {
                Ok(value) => {
                    entries.insert(value, node);
                }
                Err(err) => debug!("ignoring stored identifier: {}", err),
            }
        }
        self.preloaded.insert(namespace);
        Ok(count)
    }

    /// Resolve without ever creating.
    pub fn lookup<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
        namespace: Namespace,
        value: &str,
    ) -> Result<Option<NodeId>> {
        let value = normalize(namespace, value)?;
        if let Some(node) = self.from_cache(namespace, &value) {
            return Ok(Some(node));
        }
        if self.preloaded.contains(&namespace) {
            return Ok(None);
        }
        let id = ExternalId::new(namespace, value.clone());
        let found = store.get_node(namespace.node_type(), &id, false)?;
        if let Some(node) = found {
            self.remember(namespace, value, node);
        }
        Ok(found)
    }

    pub fn resolve_or_create<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
        namespace: Namespace,
        value: &str,
        node_type: NodeType,
    ) -> Result<NodeId> {
        let value = normalize(namespace, value)?;
        if let Some(node) = self.find(store, namespace, &value, node_type)? {
            return Ok(node);
        }
        let id = ExternalId::new(namespace, value.clone());
        let node = store
            .get_node(node_type, &id, true)?
            .ok_or_else(|| CrawlerError::store_write("get_node", format!("no node created for {}", id)))?;
        debug!("created {} {} for {}", node_type, node, id);
        self.remember(namespace, value, node);
        Ok(node)
    }

    /// Like `resolve_or_create`, but a missing node is created as a full item
    /// built by `make_item` from the canonical identifier.
    pub fn resolve_or_insert_with<S, F>(
        &mut self,
        store: &mut S,
        namespace: Namespace,
        value: &str,
        summary: &str,
        make_item: F,
    ) -> Result<NodeId>
    where
        S: GraphStore + ?Sized,
        F: FnOnce(ExternalId) -> NewItem,
    {
        let value = normalize(namespace, value)?;
        if let Some(node) = self.find(store, namespace, &value, namespace.node_type())? {
            return Ok(node);
        }
        let item = make_item(ExternalId::new(namespace, value.clone()));
        let node = store.add_item(summary, &item)?;
        debug!("added item {} {:?}", node, item.label);
        self.remember(namespace, value, node);
        Ok(node)
    }

    /// Countries come from the bootstrap and are never created here.
    pub fn country<S: GraphStore + ?Sized>(&mut self, store: &mut S, code: &str) -> Result<Option<NodeId>> {
        let code = normalize(Namespace::CountryCode, code)?;
        if let Some(node) = self.from_cache(Namespace::CountryCode, &code) {
            return Ok(Some(node));
        }
        let found = store.country_code_to_node(&code)?;
        if let Some(node) = found {
            self.remember(Namespace::CountryCode, code, node);
        }
        Ok(found)
    }

    fn find<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
        namespace: Namespace,
        value: &str,
        node_type: NodeType,
    ) -> Result<Option<NodeId>> {
        if let Some(node) = self.from_cache(namespace, value) {
            return Ok(Some(node));
        }
        if self.preloaded.contains(&namespace) {
            return Ok(None);
        }
        let found = store.get_node(node_type, &ExternalId::new(namespace, value), false)?;
        if let Some(node) = found {
            self.remember(namespace, value.to_string(), node);
        }
        Ok(found)
    }

    fn from_cache(&self, namespace: Namespace, value: &str) -> Option<NodeId> {
        self.cache.get(&namespace)?.get(value).copied()
    }

    fn remember(&mut self, namespace: Namespace, value: String, node: NodeId) {
        self.cache.entry(namespace).or_default().insert(value, node);
    }
}
