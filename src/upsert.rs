use std::fmt;

use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::{Result, UpsertError};
use crate::graph_store::{GraphStore, NewItem, Qualifier, Statement, Value};
use crate::records::{ASRelationRecord, ExchangePoint};
use crate::shared::{Class, Namespace, NodeId, NodeType, Relation};

pub const ADD_IX_SUMMARY: &str = "add new peeringDB IX";
pub const UPDATE_IX_SUMMARY: &str = "update peeringDB ixs";
pub const UPDATE_IXLAN_SUMMARY: &str = "update peeringDB ixlan";

/// A record that knows which statements it contributes to the graph.
pub trait Upsert: fmt::Display {
    /// Resolve the nodes the record talks about and write its statements.
    /// Returns the node standing for the record's subject.
    fn upsert<S: GraphStore>(&self, ctx: &mut RunContext<S>) -> Result<NodeId>;
}

/// Upsert one record, tagging a failure with the record it came from.
pub fn upsert_record<S, R>(ctx: &mut RunContext<S>, record: &R) -> std::result::Result<NodeId, UpsertError>
where
    S: GraphStore,
    R: Upsert,
{
    record
        .upsert(ctx)
        .map_err(|source| UpsertError::new(record.to_string(), source))
}

impl Upsert for ASRelationRecord {
    fn upsert<S: GraphStore>(&self, ctx: &mut RunContext<S>) -> Result<NodeId> {
        self.validate()?;
        let (resolver, store) = ctx.parts();
        let as1 = resolver.resolve_or_create(store, Namespace::Asn, &self.asn1.to_string(), NodeType::AS)?;
        let as2 = resolver.resolve_or_create(store, Namespace::Asn, &self.asn2.to_string(), NodeType::AS)?;

        // Stored once, from asn1 to asn2; `rel` keeps the BGPKIT orientation.
        let mut statement = Statement::new(Relation::PeersWith, Value::Node(as2), &ctx.reference);
        match (self.rel, self.relationship()) {
            (_, Some(rel)) => statement = statement.with_qualifier(Qualifier::Relationship(rel)),
            (Some(code), None) => warn!("{}: dropping unknown relationship code {}", self, code),
            (None, None) => {}
        }
        ctx.store.add_links(as1, &[statement])?;
        Ok(as1)
    }
}

impl Upsert for ExchangePoint {
    fn upsert<S: GraphStore>(&self, ctx: &mut RunContext<S>) -> Result<NodeId> {
        let ix = &self.record;
        ix.validate()?;
        let reference = ctx.reference.clone();
        let name = ix.name.trim().to_string();

        let ix_node = {
            let (resolver, store) = ctx.parts();
            resolver.resolve_or_insert_with(
                store,
                Namespace::PeeringdbIxId,
                &ix.id.to_string(),
                ADD_IX_SUMMARY,
                |external_id| NewItem {
                    node_type: NodeType::ExchangePoint,
                    external_id,
                    label: name.clone(),
                    description: ix.name_long.clone(),
                    statements: vec![Statement::new(
                        Relation::InstanceOf,
                        Value::Class(Class::InternetExchangePoint),
                        &reference,
                    )],
                },
            )?
        };

        let mut statements = vec![
            Statement::new(
                Relation::InstanceOf,
                Value::Class(Class::InternetExchangePoint),
                &reference,
            ),
            Statement::new(Relation::Name, Value::Literal(name), &reference),
        ];

        if let Some(org_id) = ix.org_id {
            let org_id = org_id.to_string();
            let org = {
                let (resolver, store) = ctx.parts();
                resolver.lookup(store, Namespace::PeeringdbOrgId, &org_id)?
            };
            match org {
                Some(org) => statements.push(Statement::new(Relation::ManagedBy, Value::Node(org), &reference)),
                None => ctx.note_missing(&ix.to_string(), Namespace::PeeringdbOrgId, &org_id),
            }
        }

        if let Some(code) = &ix.country {
            let country = {
                let (resolver, store) = ctx.parts();
                resolver.country(store, code)?
            };
            match country {
                Some(country) => statements.push(Statement::new(Relation::Country, Value::Node(country), &reference)),
                None => ctx.note_missing(&ix.to_string(), Namespace::CountryCode, code),
            }
        }

        if let Some(website) = &ix.website {
            statements.push(Statement::new(Relation::Website, Value::Literal(website.clone()), &reference));
        }

        if let Some(url_stats) = &ix.url_stats {
            statements.push(
                Statement::new(Relation::Website, Value::Literal(url_stats.clone()), &reference)
                    .with_qualifier(Qualifier::InstanceOf(Class::TrafficStatistics)),
            );
        }

        ctx.store.upsert_statements(UPDATE_IX_SUMMARY, ix_node, &statements)?;

        for lan_set in &self.lan_sets {
            let lan_reference = reference.with_url(&lan_set.url);
            for lan in &lan_set.lans {
                for prefix in &lan.ixpfx_set {
                    let prefix_node = {
                        let (resolver, store) = ctx.parts();
                        resolver.resolve_or_create(store, Namespace::Prefix, &prefix.prefix, NodeType::Prefix)?
                    };
                    let prefix_statements = [
                        Statement::new(Relation::InstanceOf, Value::Class(Class::PeeringLan), &lan_reference),
                        Statement::new(Relation::ManagedBy, Value::Node(ix_node), &lan_reference),
                    ];
                    ctx.store
                        .upsert_statements(UPDATE_IXLAN_SUMMARY, prefix_node, &prefix_statements)?;
                    debug!("peering LAN {} of {} -> {}", prefix.prefix, ix, prefix_node);
                }
            }
        }

        Ok(ix_node)
    }
}
