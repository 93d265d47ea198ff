pub mod bgpkit;
pub mod peeringdb;

use std::collections::HashMap;
use std::fmt;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::context::RunContext;
use crate::error::{CrawlerError, Result, UpsertError};
use crate::graph_store::GraphStore;
use crate::reference::Reference;
use crate::shared::NodeId;

pub use bgpkit::BgpkitAs2RelCrawler;
pub use peeringdb::PeeringDbIxCrawler;

/// Blocking retrieval of a dataset by URL.
pub trait Fetch {
    /// Body of a successful response; any non-success status is an error.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("iyp-crawlers/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(CrawlerError::Fetch {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Serves fixed bodies; unknown URLs answer 404.
#[derive(Debug, Default, Clone)]
pub struct CannedFetcher {
    responses: HashMap<String, (u16, Vec<u8>)>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), (200, body.into()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), (status, Vec::new()));
        self
    }
}

impl Fetch for CannedFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        match self.responses.get(url) {
            Some((status, body)) if (200..300).contains(status) => Ok(body.clone()),
            Some((status, _)) => Err(CrawlerError::Fetch {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(CrawlerError::Fetch {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn get_json<F: Fetch + ?Sized, T: DeserializeOwned>(fetcher: &F, url: &str) -> Result<T> {
    let body = fetcher.get(url)?;
    Ok(serde_json::from_slice(&body)?)
}

/// Outcome of one crawler run.
#[derive(Debug)]
pub struct RunReport {
    pub crawler: String,
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<UpsertError>,
    pub missing_references: usize,
}

impl RunReport {
    pub fn new(crawler: &str) -> Self {
        RunReport {
            crawler: crawler.to_string(),
            processed: 0,
            succeeded: 0,
            failures: Vec::new(),
            missing_references: 0,
        }
    }

    /// Count a record outcome; failures are logged and kept, never raised.
    pub fn record(&mut self, outcome: std::result::Result<NodeId, UpsertError>) {
        self.processed += 1;
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(err) => {
                error!("{}", err);
                self.failures.push(err);
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: processed {} records, {} succeeded, {} failed, {} missing references",
            self.crawler,
            self.processed,
            self.succeeded,
            self.failed(),
            self.missing_references
        )
    }
}

/// A dataset that can be pushed into the graph.
pub trait Crawler {
    /// Short name, also used for the log file.
    fn name(&self) -> &'static str;

    /// Reference shared by every statement of a run.
    fn reference(&self) -> Reference;

    /// Fetch the dataset and upsert every record into the context's store.
    /// Returns early only on fatal errors.
    fn crawl<S: GraphStore>(&self, ctx: &mut RunContext<S>, report: &mut RunReport) -> Result<()>;
}

/// Run a crawler against `store` and hand the closed store back with the report.
pub fn run<C: Crawler, S: GraphStore>(crawler: &C, store: S) -> Result<(RunReport, S)> {
    run_with_reference(crawler, store, crawler.reference())
}

pub fn run_with_reference<C: Crawler, S: GraphStore>(
    crawler: &C,
    store: S,
    reference: Reference,
) -> Result<(RunReport, S)> {
    info!(
        "starting {} (reference {} at {})",
        crawler.name(),
        reference.reference_url,
        reference.point_in_time
    );
    let mut ctx = RunContext::new(store, reference);
    let mut report = RunReport::new(crawler.name());

    if let Err(err) = crawler.crawl(&mut ctx, &mut report) {
        error!("{} aborted: {}", crawler.name(), err);
        if let Err(close_err) = ctx.finish() {
            error!("failed to close store: {}", close_err);
        }
        return Err(err);
    }

    report.missing_references = ctx.missing().len();
    let store = ctx.finish()?;
    info!("{}", report);
    Ok((report, store))
}

pub(crate) fn progress_bar(len: usize, unit: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    let template = format!("[{{elapsed_precise}}] {{bar:40}} {{pos}}/{{len}} {}", unit);
    if let Ok(style) = ProgressStyle::default_bar().template(&template) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}
