use std::fmt;

use serde::{Deserialize, Serialize};

pub type ASN = u32;

/// Store-internal identifier of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    AS,
    Organization,
    ExchangePoint,
    Country,
    Prefix,
}

impl NodeType {
    /// Label used for this node type in a property graph.
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::AS => "AS",
            NodeType::Organization => "Organization",
            NodeType::ExchangePoint => "IXP",
            NodeType::Country => "Country",
            NodeType::Prefix => "Prefix",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Kinds of external identifiers. A value maps to at most one node per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    Asn,
    PeeringdbIxId,
    PeeringdbOrgId,
    CountryCode,
    Prefix,
}

impl Namespace {
    /// Property key carrying the identifier on the node.
    pub fn key(&self) -> &'static str {
        match self {
            Namespace::Asn => "asn",
            Namespace::PeeringdbIxId => "peeringdb_ix_id",
            Namespace::PeeringdbOrgId => "peeringdb_org_id",
            Namespace::CountryCode => "country_code",
            Namespace::Prefix => "prefix",
        }
    }

    /// Node type that owns identifiers of this namespace.
    pub fn node_type(&self) -> NodeType {
        match self {
            Namespace::Asn => NodeType::AS,
            Namespace::PeeringdbIxId => NodeType::ExchangePoint,
            Namespace::PeeringdbOrgId => NodeType::Organization,
            Namespace::CountryCode => NodeType::Country,
            Namespace::Prefix => NodeType::Prefix,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    PeersWith,
    InstanceOf,
    Name,
    ManagedBy,
    Country,
    Website,
}

impl Relation {
    /// Relationship type used in a property graph.
    pub fn edge_type(&self) -> &'static str {
        match self {
            Relation::PeersWith => "PEERS_WITH",
            Relation::InstanceOf => "INSTANCE_OF",
            Relation::Name => "NAME",
            Relation::ManagedBy => "MANAGED_BY",
            Relation::Country => "COUNTRY",
            Relation::Website => "WEBSITE",
        }
    }

    /// Label and key of the node holding a literal target of this relation.
    pub fn literal_node(&self) -> (&'static str, &'static str) {
        match self {
            Relation::Name => ("Name", "name"),
            Relation::Website => ("URL", "url"),
            _ => ("Literal", "value"),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.edge_type())
    }
}

/// Well-known classes used as targets of `instance of` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Class {
    InternetExchangePoint,
    PeeringLan,
    TrafficStatistics,
}

impl Class {
    pub fn label(&self) -> &'static str {
        match self {
            Class::InternetExchangePoint => "IXP",
            Class::PeeringLan => "PeeringLAN",
            Class::TrafficStatistics => "TrafficStatistics",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Class::InternetExchangePoint => "Internet exchange point",
            Class::PeeringLan => "peering LAN",
            Class::TrafficStatistics => "traffic statistics",
        };
        write!(f, "{}", s)
    }
}

/// BGPKIT relationship code attached to `PEERS_WITH` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Relationships {
    Asn1Customer = -1,
    Peers = 0,
    Asn1Provider = 1,
}

impl Relationships {
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Relationships::Asn1Customer),
            0 => Some(Relationships::Peers),
            1 => Some(Relationships::Asn1Provider),
            _ => None,
        }
    }
}

impl fmt::Display for Relationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_codes() {
        assert_eq!(Relationships::from_code(0), Some(Relationships::Peers));
        assert_eq!(Relationships::from_code(-1), Some(Relationships::Asn1Customer));
        assert_eq!(Relationships::from_code(7), None);
        assert_eq!(Relationships::Asn1Customer.to_string(), "-1");
    }

    #[test]
    fn namespaces_point_at_their_owner() {
        assert_eq!(Namespace::Asn.node_type(), NodeType::AS);
        assert_eq!(Namespace::PeeringdbIxId.node_type(), NodeType::ExchangePoint);
        assert_eq!(Namespace::CountryCode.key(), "country_code");
    }
}
