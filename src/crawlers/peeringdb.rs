use tracing::{debug, info};

use crate::context::RunContext;
use crate::error::{CrawlerError, Result, UpsertError};
use crate::graph_store::GraphStore;
use crate::records::{ExchangePoint, ExchangePointRecord, IdRef, LanRecord, LanSet, PdbResponse};
use crate::reference::Reference;
use crate::shared::Namespace;
use crate::upsert::upsert_record;

use super::{get_json, progress_bar, Crawler, Fetch, RunReport};

pub const URL_PDB_IXS: &str = "https://peeringdb.com/api/ix";
pub const URL_PDB_LAN: &str = "https://peeringdb.com/api/ixlan";
pub const PEERINGDB_SOURCE: &str = "PeeringDB";

/// Pushes PeeringDB exchange points and their peering LAN prefixes.
pub struct PeeringDbIxCrawler<F: Fetch> {
    pub fetcher: F,
    pub ix_url: String,
    pub lan_url: String,
    pub show_progress: bool,
}

impl<F: Fetch> PeeringDbIxCrawler<F> {
    pub fn new(fetcher: F) -> Self {
        PeeringDbIxCrawler {
            fetcher,
            ix_url: URL_PDB_IXS.to_string(),
            lan_url: URL_PDB_LAN.to_string(),
            show_progress: true,
        }
    }

    pub fn with_urls(mut self, ix_url: &str, lan_url: &str) -> Self {
        self.ix_url = ix_url.trim_end_matches('/').to_string();
        self.lan_url = lan_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn list_ids(&self) -> Result<Vec<u64>> {
        let list: PdbResponse<IdRef> = get_json(&self.fetcher, &self.ix_url)?;
        Ok(list.data.into_iter().map(|ix| ix.id).collect())
    }

    /// Detail of one exchange point, with every LAN it lists.
    pub fn fetch_exchange_point(&self, id: u64) -> Result<ExchangePoint> {
        let url = format!("{}/{}", self.ix_url, id);
        let detail: PdbResponse<ExchangePointRecord> = get_json(&self.fetcher, &url)?;
        let record = detail
            .data
            .into_iter()
            .next()
            .ok_or(CrawlerError::EmptyResponse { url })?;

        let mut exchange_point = ExchangePoint::new(record.clone());
        for lan in &record.ixlan_set {
            let url = format!("{}/{}", self.lan_url, lan.id);
            let lans: PdbResponse<LanRecord> = get_json(&self.fetcher, &url)?;
            debug!("{}: {} lan records from {}", record, lans.data.len(), url);
            exchange_point = exchange_point.with_lan_set(LanSet {
                url,
                lans: lans.data,
            });
        }
        Ok(exchange_point)
    }
}

impl<F: Fetch> Crawler for PeeringDbIxCrawler<F> {
    fn name(&self) -> &'static str {
        "peeringdb_ix"
    }

    fn reference(&self) -> Reference {
        Reference::new(PEERINGDB_SOURCE, &self.ix_url)
    }

    fn crawl<S: GraphStore>(&self, ctx: &mut RunContext<S>, report: &mut RunReport) -> Result<()> {
        let ids = self.list_ids()?;
        info!("fetched {} exchange points", ids.len());

        let known_ixs = ctx.preload(Namespace::PeeringdbIxId)?;
        let known_orgs = ctx.preload(Namespace::PeeringdbOrgId)?;
        info!("{} exchange points and {} organizations already in the graph", known_ixs, known_orgs);

        let pb = progress_bar(ids.len(), "exchange points", self.show_progress);
        for id in ids {
            // An undecodable detail only loses that exchange point.
            match self.fetch_exchange_point(id) {
                Ok(exchange_point) => report.record(upsert_record(ctx, &exchange_point)),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => report.record(Err(UpsertError::new(format!("ix {}", id), err))),
            }
            pb.inc(1);
        }
        pb.finish();
        Ok(())
    }
}
