//! Typed upstream records, validated once decoded.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::error::{CrawlerError, Result};
use crate::shared::{Namespace, Relationships, ASN};

/// Trims strings and turns empty ones into `None`.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// One line of the BGPKIT as2rel dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ASRelationRecord {
    pub asn1: ASN,
    pub asn2: ASN,
    #[serde(default)]
    pub rel: Option<i8>,
    #[serde(default)]
    pub paths_count: Option<u64>,
    #[serde(default)]
    pub peers_count: Option<u64>,
}

impl ASRelationRecord {
    pub fn new(asn1: ASN, asn2: ASN) -> Self {
        ASRelationRecord {
            asn1,
            asn2,
            rel: None,
            paths_count: None,
            peers_count: None,
        }
    }

    pub fn with_rel(mut self, rel: i8) -> Self {
        self.rel = Some(rel);
        self
    }

    pub fn relationship(&self) -> Option<Relationships> {
        self.rel.and_then(Relationships::from_code)
    }

    pub fn validate(&self) -> Result<()> {
        for asn in [self.asn1, self.asn2] {
            if asn == 0 {
                return Err(CrawlerError::InvalidIdentifier {
                    namespace: Namespace::Asn,
                    value: asn.to_string(),
                    message: "AS 0 is reserved".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ASRelationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "as2rel AS{} -> AS{}", self.asn1, self.asn2)?;
        if let Some(rel) = self.rel {
            write!(f, " (rel {})", rel)?;
        }
        Ok(())
    }
}

/// PeeringDB list and detail responses wrap their payload in `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct PdbResponse<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangePointRecord {
    pub id: u64,
    #[serde(default)]
    pub org_id: Option<u64>,
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name_long: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url_stats: Option<String>,
    #[serde(default)]
    pub ixlan_set: Vec<IdRef>,
}

impl ExchangePointRecord {
    pub fn new(id: u64, name: &str) -> Self {
        ExchangePointRecord {
            id,
            org_id: None,
            name: name.to_string(),
            name_long: None,
            country: None,
            website: None,
            url_stats: None,
            ixlan_set: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrawlerError::InvalidIdentifier {
                namespace: Namespace::PeeringdbIxId,
                value: self.id.to_string(),
                message: "exchange point without a name".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ExchangePointRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ix {} ({})", self.id, self.name.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrefixRecord {
    pub prefix: String,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanRecord {
    pub id: u64,
    #[serde(default)]
    pub ixpfx_set: Vec<PrefixRecord>,
}

/// LAN records returned by one per-LAN endpoint, with the URL they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanSet {
    pub url: String,
    pub lans: Vec<LanRecord>,
}

/// An exchange point together with the LANs fetched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangePoint {
    pub record: ExchangePointRecord,
    pub lan_sets: Vec<LanSet>,
}

impl ExchangePoint {
    pub fn new(record: ExchangePointRecord) -> Self {
        ExchangePoint {
            record,
            lan_sets: Vec::new(),
        }
    }

    pub fn with_lan_set(mut self, lan_set: LanSet) -> Self {
        self.lan_sets.push(lan_set);
        self
    }
}

impl fmt::Display for ExchangePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)
    }
}
