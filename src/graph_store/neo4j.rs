//! Neo4j store spoken to through the HTTP transactional Cypher endpoint.
//!
//! Every call is one blocking POST to `{url}/db/{database}/tx/commit`, so the
//! statements of a single upsert commit or fail together. Labels, relationship
//! types and property keys come from closed enums; values are always passed as
//! query parameters.

use std::collections::HashMap;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use tracing::{debug, info};

use crate::error::{CrawlerError, Result};
use crate::shared::{Namespace, NodeId, NodeType};

use super::{ExternalId, GraphStore, NewItem, Qualifier, Statement, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Neo4jConfig {
            url: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

impl Neo4jConfig {
    pub fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.url.trim_end_matches('/'),
            self.database
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherStatement {
    pub statement: String,
    pub parameters: Json,
}

impl CypherStatement {
    fn new(statement: String, parameters: Json) -> Self {
        CypherStatement {
            statement,
            parameters,
        }
    }
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: &'a [CypherStatement],
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Json>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

pub struct Neo4jGraphStore {
    client: Client,
    config: Neo4jConfig,
    closed: bool,
}

impl Neo4jGraphStore {
    pub fn connect(config: Neo4jConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        let store = Neo4jGraphStore {
            client,
            config,
            closed: false,
        };
        // Fail before the first fetch rather than on the first record.
        store
            .post(&[CypherStatement::new("RETURN 1".to_string(), json!({}))])
            .map_err(|message| CrawlerError::Config {
                message: format!("neo4j at {} is unreachable: {}", store.config.url, message),
            })?;
        info!("connected to neo4j at {}", store.config.url);
        Ok(store)
    }

    fn post(&self, statements: &[CypherStatement]) -> std::result::Result<Vec<TxResult>, String> {
        if self.closed {
            return Err("store is closed".to_string());
        }
        let response = self
            .client
            .post(self.config.commit_url())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&TxRequest { statements })
            .send()
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("neo4j returned {}", status));
        }
        let body: TxResponse = response.json().map_err(|e| e.to_string())?;
        if let Some(error) = body.errors.first() {
            return Err(format!("{}: {}", error.code, error.message));
        }
        Ok(body.results)
    }

    fn write(&self, operation: &str, statements: &[CypherStatement]) -> Result<Vec<TxResult>> {
        self.post(statements)
            .map_err(|message| CrawlerError::store_write(operation, message))
    }

    fn read(&self, statement: CypherStatement) -> Result<Vec<Vec<Json>>> {
        let results = self
            .post(&[statement])
            .map_err(|message| CrawlerError::StoreQuery { message })?;
        Ok(into_rows(results))
    }
}

fn into_rows(results: Vec<TxResult>) -> Vec<Vec<Json>> {
    results
        .into_iter()
        .flat_map(|result| result.data)
        .map(|row| row.row)
        .collect()
}

fn first_node_id(rows: &[Vec<Json>]) -> Option<NodeId> {
    rows.first()
        .and_then(|row| row.first())
        .and_then(Json::as_u64)
        .map(NodeId)
}

/// ASNs are stored as integers, every other identifier as a string.
pub fn identifier_param(id: &ExternalId) -> Json {
    match id.namespace {
        Namespace::Asn => id
            .value
            .parse::<u64>()
            .map(Json::from)
            .unwrap_or_else(|_| Json::from(id.value.clone())),
        _ => Json::from(id.value.clone()),
    }
}

pub fn match_node_query(node_type: NodeType, id: &ExternalId) -> CypherStatement {
    CypherStatement::new(
        format!(
            "MATCH (n:{} {{{}: $value}}) RETURN id(n) LIMIT 1",
            node_type.label(),
            id.namespace.key()
        ),
        json!({ "value": identifier_param(id) }),
    )
}

pub fn merge_node_query(node_type: NodeType, id: &ExternalId) -> CypherStatement {
    CypherStatement::new(
        format!(
            "MERGE (n:{} {{{}: $value}}) RETURN id(n)",
            node_type.label(),
            id.namespace.key()
        ),
        json!({ "value": identifier_param(id) }),
    )
}

fn edge_properties(statement: &Statement) -> Json {
    let mut props = Map::new();
    props.insert("reference_org".into(), json!(statement.reference.source));
    props.insert("reference_url".into(), json!(statement.reference.reference_url));
    props.insert(
        "reference_time".into(),
        json!(statement.reference.point_in_time.to_rfc3339()),
    );
    props.insert("qualifiers".into(), json!(statement.identity()));
    for qualifier in &statement.qualifiers {
        let value = match qualifier {
            Qualifier::InstanceOf(class) => json!(class.to_string()),
            Qualifier::Relationship(rel) => json!(*rel as i8),
        };
        props.insert(qualifier.key().into(), value);
    }
    Json::Object(props)
}

/// Cypher upserting one statement attached to `source`.
///
/// The edge is merged on its identifying qualifiers, so a qualified and an
/// unqualified statement towards the same target stay two edges.
pub fn statement_query(source: NodeId, statement: &Statement) -> CypherStatement {
    let rel = statement.relation.edge_type();
    let props = edge_properties(statement);
    match &statement.target {
        Value::Node(target) => CypherStatement::new(
            format!(
                "MATCH (a) WHERE id(a) = $source \
                 MATCH (b) WHERE id(b) = $target \
                 MERGE (a)-[r:{} {{qualifiers: $props.qualifiers}}]->(b) SET r = $props",
                rel
            ),
            json!({ "source": source.0, "target": target.0, "props": props }),
        ),
        Value::Class(class) => CypherStatement::new(
            format!(
                "MATCH (a) WHERE id(a) = $source SET a:{} \
                 MERGE (c:Class {{name: $class}}) \
                 MERGE (a)-[r:{} {{qualifiers: $props.qualifiers}}]->(c) SET r = $props",
                class.label(),
                rel
            ),
            json!({ "source": source.0, "class": class.to_string(), "props": props }),
        ),
        Value::Literal(value) => {
            let (label, key) = statement.relation.literal_node();
            CypherStatement::new(
                format!(
                    "MATCH (a) WHERE id(a) = $source \
                     MERGE (b:{} {{{}: $value}}) \
                     MERGE (a)-[r:{} {{qualifiers: $props.qualifiers}}]->(b) SET r = $props",
                    label, key, rel
                ),
                json!({ "source": source.0, "value": value, "props": props }),
            )
        }
    }
}

impl GraphStore for Neo4jGraphStore {
    fn get_node(
        &mut self,
        node_type: NodeType,
        id: &ExternalId,
        create: bool,
    ) -> Result<Option<NodeId>> {
        if !create {
            return Ok(first_node_id(&self.read(match_node_query(node_type, id))?));
        }
        let rows = into_rows(self.write("get_node", &[merge_node_query(node_type, id)])?);
        match first_node_id(&rows) {
            Some(node) => Ok(Some(node)),
            None => Err(CrawlerError::store_write(
                "get_node",
                format!("merge returned no node for {}", id),
            )),
        }
    }

    fn add_item(&mut self, summary: &str, item: &NewItem) -> Result<NodeId> {
        let create = CypherStatement::new(
            format!(
                "MERGE (n:{} {{{}: $value}}) SET n.name = $label, n.description = $description \
                 RETURN id(n)",
                item.node_type.label(),
                item.external_id.namespace.key()
            ),
            json!({
                "value": identifier_param(&item.external_id),
                "label": item.label,
                "description": item.description,
            }),
        );
        let rows = into_rows(self.write("add_item", &[create])?);
        let node = first_node_id(&rows).ok_or_else(|| {
            CrawlerError::store_write("add_item", format!("no node for {}", item.external_id))
        })?;
        self.upsert_statements(summary, node, &item.statements)?;
        Ok(node)
    }

    fn add_links(&mut self, source: NodeId, statements: &[Statement]) -> Result<()> {
        let queries: Vec<CypherStatement> = statements
            .iter()
            .map(|statement| statement_query(source, statement))
            .collect();
        self.write("add_links", &queries)?;
        Ok(())
    }

    fn upsert_statements(
        &mut self,
        summary: &str,
        node: NodeId,
        statements: &[Statement],
    ) -> Result<()> {
        debug!("{}: {} statements on {}", summary, statements.len(), node);
        let queries: Vec<CypherStatement> = statements
            .iter()
            .map(|statement| statement_query(node, statement))
            .collect();
        self.write(summary, &queries)?;
        Ok(())
    }

    fn external_id_to_node(&mut self, namespace: Namespace) -> Result<HashMap<String, NodeId>> {
        let rows = self.read(CypherStatement::new(
            format!(
                "MATCH (n:{label}) WHERE n.{key} IS NOT NULL RETURN n.{key}, id(n)",
                label = namespace.node_type().label(),
                key = namespace.key()
            ),
            json!({}),
        ))?;
        let mut mapping = HashMap::with_capacity(rows.len());
        for row in rows {
            let (Some(value), Some(node)) = (row.first(), row.get(1).and_then(Json::as_u64)) else {
                continue;
            };
            let value = match value {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            };
            mapping.insert(value, NodeId(node));
        }
        Ok(mapping)
    }

    fn country_code_to_node(&mut self, code: &str) -> Result<Option<NodeId>> {
        let id = ExternalId::new(Namespace::CountryCode, code.trim().to_uppercase());
        Ok(first_node_id(
            &self.read(match_node_query(NodeType::Country, &id))?,
        ))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        info!("closed neo4j store at {}", self.config.url);
        Ok(())
    }
}
