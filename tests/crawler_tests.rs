use std::io::Write;

use bzip2::write::BzEncoder;
use bzip2::Compression;
use chrono::Utc;
use serde_json::json;

use iyp_crawlers::crawlers::bgpkit::decode_as2rel;
use iyp_crawlers::crawlers::{run, CannedFetcher, Crawler};
use iyp_crawlers::graph_store::{ExternalId, MemoryGraphStore, Value};
use iyp_crawlers::reference::start_of_day;
use iyp_crawlers::shared::{Class, Namespace, NodeType, Relation};
use iyp_crawlers::{BgpkitAs2RelCrawler, CrawlerError, PeeringDbIxCrawler};

const AS2REL_URL: &str = "https://data.bgpkit.com/as2rel/as2rel-latest.json.bz2";

fn bz2(body: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

fn as2rel_fetcher() -> CannedFetcher {
    let body = json!([
        {"asn1": 64500, "asn2": 64501, "rel": 0, "paths_count": 10, "peers_count": 3},
        {"asn1": 64500, "asn2": 64502, "rel": 1},
        {"asn1": 0, "asn2": 64503},
        {"asn1": 64502, "asn2": 64501}
    ]);
    CannedFetcher::new().with_body(AS2REL_URL, bz2(body.to_string().as_bytes()))
}

fn peeringdb_fetcher() -> CannedFetcher {
    CannedFetcher::new()
        .with_body(
            "https://peeringdb.com/api/ix",
            json!({"data": [{"id": 1, "name": "IX One"}, {"id": 2, "name": "IX Two"}]}).to_string(),
        )
        .with_body(
            "https://peeringdb.com/api/ix/1",
            json!({"data": [{
                "id": 1, "org_id": 10, "name": "IX One", "name_long": "First Exchange",
                "country": "FR", "website": "https://one.example", "url_stats": "",
                "ixlan_set": [{"id": 100}]
            }]})
            .to_string(),
        )
        .with_body(
            "https://peeringdb.com/api/ix/2",
            json!({"data": [{
                "id": 2, "org_id": 20, "name": "IX Two", "name_long": "",
                "country": "", "website": null, "url_stats": "https://two.example/stats",
                "ixlan_set": [{"id": 200}]
            }]})
            .to_string(),
        )
        .with_body(
            "https://peeringdb.com/api/ixlan/100",
            json!({"data": [{"id": 100, "ixpfx_set": [
                {"prefix": "192.0.2.0/24", "protocol": "IPv4"},
                {"prefix": "2001:db8:100::/64", "protocol": "IPv6"}
            ]}]})
            .to_string(),
        )
        .with_body(
            "https://peeringdb.com/api/ixlan/200",
            json!({"data": [{"id": 200, "ixpfx_set": [{"prefix": "198.51.100.0/24"}]}]}).to_string(),
        )
}

#[test]
fn test_decode_as2rel() {
    let records = decode_as2rel(bz2(br#"[{"asn1": 1, "asn2": 2}]"#).as_slice()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!((records[0].asn1, records[0].asn2), (1, 2));

    assert!(matches!(
        decode_as2rel(&b"not bz2"[..]),
        Err(CrawlerError::Decode(_))
    ));
}

#[test]
fn test_bgpkit_run() {
    let crawler = BgpkitAs2RelCrawler::new(as2rel_fetcher()).with_progress(false);

    let (report, store) = run(&crawler, MemoryGraphStore::new()).unwrap();

    assert_eq!(report.crawler, "bgpkit_as2rel");
    assert_eq!(report.processed, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed(), 1);
    assert!(matches!(report.failures[0].source, CrawlerError::InvalidIdentifier { .. }));
    assert!(store.is_closed());

    // 64500, 64501, 64502; the AS 0 record created nothing
    assert_eq!(store.node_count(), 3);
    assert_eq!(store.statement_count(), 3);

    let as64500 = store.find(&ExternalId::new(Namespace::Asn, "64500")).unwrap();
    let statements = store.statements(as64500);
    assert_eq!(statements.len(), 2);
    let today = start_of_day(Utc::now());
    for statement in statements {
        assert_eq!(statement.relation, Relation::PeersWith);
        assert_eq!(statement.reference.source, "BGPKIT");
        assert_eq!(statement.reference.reference_url, AS2REL_URL);
        assert_eq!(statement.reference.point_in_time, today);
    }
}

#[test]
fn test_bgpkit_fetch_failure_is_fatal() {
    let fetcher = CannedFetcher::new().with_status(AS2REL_URL, 500);
    let crawler = BgpkitAs2RelCrawler::new(fetcher).with_progress(false);

    let result = run(&crawler, MemoryGraphStore::new());

    match result {
        Err(err) => {
            assert!(err.is_fatal());
            assert!(matches!(err, CrawlerError::Fetch { status: 500, .. }));
        }
        Ok(_) => panic!("run should abort"),
    }
}

#[test]
fn test_bgpkit_reference() {
    let crawler = BgpkitAs2RelCrawler::new(CannedFetcher::new()).with_url("https://mirror.example/as2rel.json.bz2");
    let reference = crawler.reference();
    assert_eq!(reference.source, "BGPKIT");
    assert_eq!(reference.reference_url, "https://mirror.example/as2rel.json.bz2");
    assert_eq!(reference.point_in_time, start_of_day(Utc::now()));
}

#[test]
fn test_peeringdb_run() {
    let store = MemoryGraphStore::new()
        .with_country("FR")
        .with_node(NodeType::Organization, ExternalId::new(Namespace::PeeringdbOrgId, "10"));
    let crawler = PeeringDbIxCrawler::new(peeringdb_fetcher()).with_progress(false);

    let (report, store) = run(&crawler, store).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 0);
    // org 20 is unknown
    assert_eq!(report.missing_references, 1);

    let ix1 = store.find(&ExternalId::new(Namespace::PeeringdbIxId, "1")).unwrap();
    let ix2 = store.find(&ExternalId::new(Namespace::PeeringdbIxId, "2")).unwrap();
    assert_eq!(store.node(ix1).unwrap().description.as_deref(), Some("First Exchange"));
    assert_eq!(store.node(ix2).unwrap().description, None);

    let ix1_relations: Vec<Relation> = store.statements(ix1).iter().map(|s| s.relation).collect();
    assert!(ix1_relations.contains(&Relation::ManagedBy));
    assert!(ix1_relations.contains(&Relation::Country));
    assert_eq!(ix1_relations.len(), 5);

    let ix2_relations: Vec<Relation> = store.statements(ix2).iter().map(|s| s.relation).collect();
    assert!(!ix2_relations.contains(&Relation::ManagedBy));
    assert!(!ix2_relations.contains(&Relation::Country));
    assert_eq!(ix2_relations.len(), 3);

    let lan = store.find(&ExternalId::new(Namespace::Prefix, "198.51.100.0/24")).unwrap();
    let lan_statements = store.statements(lan);
    assert!(lan_statements
        .iter()
        .any(|s| s.target == Value::Class(Class::PeeringLan)));
    assert!(lan_statements.iter().any(|s| s.target == Value::Node(ix2)));
    assert!(lan_statements
        .iter()
        .all(|s| s.reference.reference_url == "https://peeringdb.com/api/ixlan/200"));

    assert!(store.find(&ExternalId::new(Namespace::Prefix, "2001:db8:100::/64")).is_some());
    assert!(store.is_closed());
}

#[test]
fn test_peeringdb_rerun_creates_nothing() {
    let crawler = PeeringDbIxCrawler::new(peeringdb_fetcher()).with_progress(false);
    let (_, store) = run(&crawler, MemoryGraphStore::new().with_country("FR")).unwrap();
    let nodes = store.node_count();
    let statements = store.statement_count();

    // Same graph, fresh run: IX ids are preloaded and prefixes found by lookup.
    let mut reopened = MemoryGraphStore::new();
    for node in store.nodes() {
        reopened.seed(node.node_type, node.external_ids[0].clone());
    }
    let (report, reopened) = run(&crawler, reopened).unwrap();

    assert_eq!(report.failed(), 0);
    assert_eq!(reopened.creations(), 0);
    assert_eq!(reopened.node_count(), nodes);
    assert_eq!(reopened.statement_count(), statements);
}

#[test]
fn test_peeringdb_lan_fetch_failure_is_fatal() {
    let fetcher = peeringdb_fetcher().with_status("https://peeringdb.com/api/ixlan/200", 429);
    let crawler = PeeringDbIxCrawler::new(fetcher).with_progress(false);

    let result = run(&crawler, MemoryGraphStore::new());

    assert!(matches!(result, Err(CrawlerError::Fetch { status: 429, .. })));
}

#[test]
fn test_peeringdb_empty_detail_is_fatal() {
    let fetcher = peeringdb_fetcher().with_body("https://peeringdb.com/api/ix/2", r#"{"data": []}"#);
    let crawler = PeeringDbIxCrawler::new(fetcher).with_progress(false);

    let result = run(&crawler, MemoryGraphStore::new());

    assert!(matches!(result, Err(CrawlerError::EmptyResponse { .. })));
}

#[test]
fn test_peeringdb_undecodable_detail_skips_one_exchange_point() {
    let fetcher = peeringdb_fetcher().with_body(
        "https://peeringdb.com/api/ix/1",
        json!({"data": [{"id": 1, "name": null, "ixlan_set": []}]}).to_string(),
    );
    let crawler = PeeringDbIxCrawler::new(fetcher).with_progress(false);

    let (report, store) = run(&crawler, MemoryGraphStore::new()).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].record, "ix 1");
    assert!(matches!(report.failures[0].source, CrawlerError::Decode(_)));
    assert!(store.find(&ExternalId::new(Namespace::PeeringdbIxId, "1")).is_none());
    assert!(store.find(&ExternalId::new(Namespace::PeeringdbIxId, "2")).is_some());
}

#[test]
fn test_snapshot_dump() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dumps").join("as2rel.json");
    let crawler = BgpkitAs2RelCrawler::new(as2rel_fetcher()).with_progress(false);

    let (_, store) = run(&crawler, MemoryGraphStore::new()).unwrap();
    store.write_snapshot(&path).unwrap();

    let dumped: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let nodes = dumped.as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["node_type"], json!("AS"));
    assert_eq!(nodes[0]["statements"][0]["relation"], json!("PeersWith"));
}
