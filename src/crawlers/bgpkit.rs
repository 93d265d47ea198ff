use std::io::Read;

use bzip2::read::BzDecoder;
use tracing::info;

use crate::context::RunContext;
use crate::error::Result;
use crate::graph_store::GraphStore;
use crate::records::ASRelationRecord;
use crate::reference::Reference;
use crate::upsert::upsert_record;

use super::{progress_bar, Crawler, Fetch, RunReport};

pub const URL_BGPKIT_AS2REL: &str = "https://data.bgpkit.com/as2rel/as2rel-latest.json.bz2";
pub const BGPKIT_SOURCE: &str = "BGPKIT";

/// Pushes BGPKIT AS relationships as `PEERS_WITH` edges.
pub struct BgpkitAs2RelCrawler<F: Fetch> {
    pub fetcher: F,
    pub url: String,
    pub show_progress: bool,
}

impl<F: Fetch> BgpkitAs2RelCrawler<F> {
    pub fn new(fetcher: F) -> Self {
        BgpkitAs2RelCrawler {
            fetcher,
            url: URL_BGPKIT_AS2REL.to_string(),
            show_progress: true,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn fetch_relations(&self) -> Result<Vec<ASRelationRecord>> {
        info!("downloading AS relationships from {}", self.url);
        let bz2_data = self.fetcher.get(&self.url)?;
        decode_as2rel(bz2_data.as_slice())
    }
}

/// Decode a bz2-compressed JSON array of relationships.
pub fn decode_as2rel<R: Read>(bz2_data: R) -> Result<Vec<ASRelationRecord>> {
    let decoder = BzDecoder::new(bz2_data);
    Ok(serde_json::from_reader(decoder)?)
}

impl<F: Fetch> Crawler for BgpkitAs2RelCrawler<F> {
    fn name(&self) -> &'static str {
        "bgpkit_as2rel"
    }

    fn reference(&self) -> Reference {
        Reference::new(BGPKIT_SOURCE, &self.url)
    }

    fn crawl<S: GraphStore>(&self, ctx: &mut RunContext<S>, report: &mut RunReport) -> Result<()> {
        let relations = self.fetch_relations()?;
        info!("fetched {} relationships", relations.len());

        let pb = progress_bar(relations.len(), "relationships", self.show_progress);
        for relation in &relations {
            report.record(upsert_record(ctx, relation));
            pb.inc(1);
        }
        pb.finish();
        Ok(())
    }
}
