use tracing::warn;

use crate::error::{CrawlerError, Result};
use crate::graph_store::GraphStore;
use crate::reference::Reference;
use crate::resolver::IdentifierResolver;
use crate::shared::Namespace;

/// Everything a single crawler run owns: the store handle, the identifier
/// caches and the reference shared by every statement of the run.
pub struct RunContext<S: GraphStore> {
    pub store: S,
    pub resolver: IdentifierResolver,
    pub reference: Reference,
    missing: Vec<CrawlerError>,
}

impl<S: GraphStore> RunContext<S> {
    pub fn new(store: S, reference: Reference) -> Self {
        RunContext {
            store,
            resolver: IdentifierResolver::new(),
            reference,
            missing: Vec::new(),
        }
    }

    /// Split borrow for resolver calls that need the store.
    pub fn parts(&mut self) -> (&mut IdentifierResolver, &mut S) {
        (&mut self.resolver, &mut self.store)
    }

    pub fn preload(&mut self, namespace: Namespace) -> Result<usize> {
        let (resolver, store) = self.parts();
        resolver.preload(store, namespace)
    }

    /// A relation was dropped because its target is not in the graph.
    pub fn note_missing(&mut self, context: &str, namespace: Namespace, value: &str) {
        warn!("{}: no node for {} {}, relation skipped", context, namespace, value);
        self.missing.push(CrawlerError::MissingReference {
            namespace,
            value: value.to_string(),
        });
    }

    pub fn missing(&self) -> &[CrawlerError] {
        &self.missing
    }

    /// Close the store and hand it back.
    pub fn finish(mut self) -> Result<S> {
        self.store.close()?;
        Ok(self.store)
    }
}
