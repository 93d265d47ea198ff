// Re-export all public modules
pub mod shared;
pub mod error;
pub mod reference;
pub mod graph_store;
pub mod resolver;
pub mod records;
pub mod context;
pub mod upsert;
pub mod crawlers;
pub mod config;

// Re-export commonly used types at the crate root
pub use config::{CrawlerConfig, StoreConfig};
pub use context::RunContext;
pub use crawlers::{run, BgpkitAs2RelCrawler, Crawler, PeeringDbIxCrawler, RunReport};
pub use error::{CrawlerError, Result, UpsertError};
pub use graph_store::{ExternalId, GraphStore, MemoryGraphStore, Neo4jGraphStore, Statement, Value};
pub use reference::Reference;
pub use resolver::IdentifierResolver;
pub use shared::{Class, Namespace, NodeId, NodeType, Relation, ASN};
