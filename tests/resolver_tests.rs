use std::collections::HashMap;

use iyp_crawlers::error::{CrawlerError, Result};
use iyp_crawlers::graph_store::{ExternalId, GraphStore, MemoryGraphStore, NewItem, Statement};
use iyp_crawlers::resolver::IdentifierResolver;
use iyp_crawlers::shared::{Namespace, NodeId, NodeType};

/// Memory store counting every lookup that reaches it.
#[derive(Default)]
struct CountingStore {
    inner: MemoryGraphStore,
    lookups: usize,
    fail_creations: bool,
}

impl GraphStore for CountingStore {
    fn get_node(&mut self, node_type: NodeType, id: &ExternalId, create: bool) -> Result<Option<NodeId>> {
        self.lookups += 1;
        if create && self.fail_creations {
            return Err(CrawlerError::store_write("get_node", "rejected"));
        }
        self.inner.get_node(node_type, id, create)
    }

    fn add_item(&mut self, summary: &str, item: &NewItem) -> Result<NodeId> {
        self.inner.add_item(summary, item)
    }

    fn add_links(&mut self, source: NodeId, statements: &[Statement]) -> Result<()> {
        self.inner.add_links(source, statements)
    }

    fn upsert_statements(&mut self, summary: &str, node: NodeId, statements: &[Statement]) -> Result<()> {
        self.inner.upsert_statements(summary, node, statements)
    }

    fn external_id_to_node(&mut self, namespace: Namespace) -> Result<HashMap<String, NodeId>> {
        self.inner.external_id_to_node(namespace)
    }

    fn country_code_to_node(&mut self, code: &str) -> Result<Option<NodeId>> {
        self.lookups += 1;
        self.inner.country_code_to_node(code)
    }
}

#[test]
fn test_repeated_identifier_resolves_to_same_node() {
    let mut store = CountingStore::default();
    let mut resolver = IdentifierResolver::new();

    let first = resolver
        .resolve_or_create(&mut store, Namespace::Asn, "64500", NodeType::AS)
        .unwrap();
    let lookups_after_first = store.lookups;

    for _ in 0..5 {
        let again = resolver
            .resolve_or_create(&mut store, Namespace::Asn, "64500", NodeType::AS)
            .unwrap();
        assert_eq!(again, first);
    }

    assert_eq!(store.inner.creations(), 1);
    assert_eq!(store.lookups, lookups_after_first);
}

#[test]
fn test_equivalent_spellings_share_a_node() {
    let mut store = MemoryGraphStore::new();
    let mut resolver = IdentifierResolver::new();

    let a = resolver
        .resolve_or_create(&mut store, Namespace::Prefix, "192.0.2.1/24", NodeType::Prefix)
        .unwrap();
    let b = resolver
        .resolve_or_create(&mut store, Namespace::Prefix, " 192.0.2.0/24 ", NodeType::Prefix)
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(store.creations(), 1);
    assert!(store
        .find(&ExternalId::new(Namespace::Prefix, "192.0.2.0/24"))
        .is_some());
}

#[test]
fn test_existing_node_is_found_not_created() {
    let mut store = MemoryGraphStore::new();
    let existing = store.seed(NodeType::AS, ExternalId::new(Namespace::Asn, "13335"));
    let mut resolver = IdentifierResolver::new();

    let node = resolver
        .resolve_or_create(&mut store, Namespace::Asn, "13335", NodeType::AS)
        .unwrap();

    assert_eq!(node, existing);
    assert_eq!(store.creations(), 0);
}

#[test]
fn test_same_value_in_different_namespaces() {
    let mut store = MemoryGraphStore::new();
    let mut resolver = IdentifierResolver::new();

    let ix = resolver
        .resolve_or_create(&mut store, Namespace::PeeringdbIxId, "42", NodeType::ExchangePoint)
        .unwrap();
    let org = resolver
        .resolve_or_create(&mut store, Namespace::PeeringdbOrgId, "42", NodeType::Organization)
        .unwrap();

    assert_ne!(ix, org);
    assert_eq!(store.creations(), 2);
}

#[test]
fn test_empty_value_is_rejected() {
    let mut store = MemoryGraphStore::new();
    let mut resolver = IdentifierResolver::new();

    let result = resolver.resolve_or_create(&mut store, Namespace::PeeringdbIxId, "  ", NodeType::ExchangePoint);

    assert!(matches!(result, Err(CrawlerError::InvalidIdentifier { .. })));
    assert_eq!(store.creations(), 0);
}

#[test]
fn test_creation_failure_propagates_and_is_not_cached() {
    let mut store = CountingStore {
        fail_creations: true,
        ..CountingStore::default()
    };
    let mut resolver = IdentifierResolver::new();

    let result = resolver.resolve_or_create(&mut store, Namespace::Asn, "64500", NodeType::AS);
    assert!(matches!(result, Err(CrawlerError::StoreWrite { .. })));
    // lookup, then the rejected creation
    assert_eq!(store.lookups, 2);

    store.fail_creations = false;
    assert!(resolver
        .resolve_or_create(&mut store, Namespace::Asn, "64500", NodeType::AS)
        .is_ok());
    // nothing was cached, so the retry goes back to the store
    assert_eq!(store.lookups, 4);
    assert_eq!(store.inner.creations(), 1);
}

#[test]
fn test_preloaded_namespace_skips_store_lookups() {
    let mut store = CountingStore::default();
    let org = store
        .inner
        .seed(NodeType::Organization, ExternalId::new(Namespace::PeeringdbOrgId, "7"));
    let mut resolver = IdentifierResolver::new();

    assert_eq!(resolver.preload(&mut store, Namespace::PeeringdbOrgId).unwrap(), 1);
    let lookups = store.lookups;

    assert_eq!(resolver.lookup(&mut store, Namespace::PeeringdbOrgId, "7").unwrap(), Some(org));
    assert_eq!(resolver.lookup(&mut store, Namespace::PeeringdbOrgId, "8").unwrap(), None);
    assert_eq!(store.lookups, lookups);
}

#[test]
fn test_lookup_never_creates() {
    let mut store = MemoryGraphStore::new();
    let mut resolver = IdentifierResolver::new();

    assert_eq!(resolver.lookup(&mut store, Namespace::PeeringdbOrgId, "99").unwrap(), None);
    assert_eq!(store.creations(), 0);
    assert_eq!(store.node_count(), 0);
}

#[test]
fn test_country_lookup_is_cached() {
    let mut store = CountingStore {
        inner: MemoryGraphStore::new().with_country("NL"),
        ..CountingStore::default()
    };
    let mut resolver = IdentifierResolver::new();

    let nl = resolver.country(&mut store, "nl").unwrap();
    assert!(nl.is_some());
    let lookups = store.lookups;

    assert_eq!(resolver.country(&mut store, "NL").unwrap(), nl);
    assert_eq!(store.lookups, lookups);
    assert_eq!(resolver.country(&mut store, "ZZ").unwrap(), None);
    assert_eq!(store.inner.creations(), 0);
}
