use std::path::{Path, PathBuf};

use crate::crawlers::bgpkit::URL_BGPKIT_AS2REL;
use crate::crawlers::peeringdb::{URL_PDB_IXS, URL_PDB_LAN};
use crate::error::{CrawlerError, Result};
use crate::graph_store::Neo4jConfig;

/// Directory receiving one log file per crawler.
pub const DEFAULT_LOG_DIR: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Keep the graph in memory, optionally dumping it as JSON once the run ends.
    Memory { dump: Option<PathBuf> },
    Neo4j(Neo4jConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    pub store: StoreConfig,
    pub log_dir: PathBuf,
    pub show_progress: bool,
    pub as2rel_url: String,
    pub ix_url: String,
    pub lan_url: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlerConfig {
            store: StoreConfig::Neo4j(Neo4jConfig::default()),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            show_progress: true,
            as2rel_url: URL_BGPKIT_AS2REL.to_string(),
            ix_url: URL_PDB_IXS.to_string(),
            lan_url: URL_PDB_LAN.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_log_dir(mut self, dir: &Path) -> Self {
        self.log_dir = dir.to_path_buf();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_as2rel_url(mut self, url: &str) -> Self {
        self.as2rel_url = url.to_string();
        self
    }

    pub fn with_peeringdb_urls(mut self, ix_url: &str, lan_url: &str) -> Self {
        self.ix_url = ix_url.to_string();
        self.lan_url = lan_url.to_string();
        self
    }

    /// `log/<crawler>.log`
    pub fn log_file(&self, crawler: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", crawler))
    }

    pub fn validate(&self) -> Result<()> {
        for url in [&self.as2rel_url, &self.ix_url, &self.lan_url] {
            check_url(url)?;
        }
        if let StoreConfig::Neo4j(neo4j) = &self.store {
            check_url(&neo4j.url)?;
            if neo4j.database.trim().is_empty() {
                return Err(CrawlerError::Config {
                    message: "neo4j database name is empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn check_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(CrawlerError::Config {
            message: format!("not an http(s) url: {:?}", url),
        })
    }
}
