//! Data model for the Pi-hole `api.php` summary response.
//!
//! Every field is optional: anything missing or `null` in the response
//! decodes to zero or an empty mapping. Fields this exporter does not use (over-time
//! series, gravity information, recent blocked domain...) are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, de};

/// A mapping entry as sent by Pi-hole, kept raw until it is rendered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// A key to value mapping such as `top_queries` or `querytypes`.
pub type Distribution = BTreeMap<String, RawValue>;

/// One decoded Pi-hole response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub domains_being_blocked: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dns_queries_today: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ads_blocked_today: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ads_percentage_today: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unique_domains: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_forwarded: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_cached: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients_ever_seen: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unique_clients: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_distribution")]
    pub top_queries: Distribution,
    #[serde(default, deserialize_with = "lenient_distribution")]
    pub top_ads: Distribution,
    #[serde(default, deserialize_with = "lenient_distribution")]
    pub top_sources: Distribution,
    #[serde(default, deserialize_with = "lenient_distribution")]
    pub forward_destinations: Distribution,
    #[serde(default, deserialize_with = "lenient_distribution")]
    pub querytypes: Distribution,
}

/// Single-valued snapshot fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    DomainsBeingBlocked,
    DnsQueriesToday,
    AdsBlockedToday,
    AdsPercentageToday,
    UniqueDomains,
    QueriesForwarded,
    QueriesCached,
    ClientsEverSeen,
    UniqueClients,
}

/// Multi-valued snapshot fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionField {
    TopQueries,
    TopAds,
    TopSources,
    ForwardDestinations,
    QueryTypes,
}

impl Snapshot {
    /// Parse a snapshot from a raw response body.
    ///
    /// The body must be a JSON object. Pi-hole answers `[]` to requests it
    /// refuses, which serde would otherwise accept as an all-default struct.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(&b'{') | None => serde_json::from_slice(body),
            Some(_) => {
                // Syntax errors keep their position; valid non-objects are rejected
                let value: serde_json::Value = serde_json::from_slice(body)?;
                Err(de::Error::custom(format!(
                    "expected a JSON object, found {}",
                    json_kind(&value)
                )))
            }
        }
    }

    /// Read a scalar field as a float.
    pub fn scalar(&self, field: ScalarField) -> f64 {
        match field {
            ScalarField::DomainsBeingBlocked => self.domains_being_blocked as f64,
            ScalarField::DnsQueriesToday => self.dns_queries_today as f64,
            ScalarField::AdsBlockedToday => self.ads_blocked_today as f64,
            ScalarField::AdsPercentageToday => self.ads_percentage_today,
            ScalarField::UniqueDomains => self.unique_domains as f64,
            ScalarField::QueriesForwarded => self.queries_forwarded as f64,
            ScalarField::QueriesCached => self.queries_cached as f64,
            ScalarField::ClientsEverSeen => self.clients_ever_seen as f64,
            ScalarField::UniqueClients => self.unique_clients as f64,
        }
    }

    /// Borrow a multi-valued field.
    pub fn distribution(&self, field: DistributionField) -> &Distribution {
        match field {
            DistributionField::TopQueries => &self.top_queries,
            DistributionField::TopAds => &self.top_ads,
            DistributionField::TopSources => &self.top_sources,
            DistributionField::ForwardDestinations => &self.forward_destinations,
            DistributionField::QueryTypes => &self.querytypes,
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accept a JSON object, `null`, or an empty array.
///
/// PHP's `json_encode` turns an empty associative array into `[]`, so Pi-hole
/// sends `"top_ads": []` when nothing was blocked yet.
fn lenient_distribution<'de, D>(deserializer: D) -> Result<Distribution, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(Distribution),
        List(Vec<serde_json::Value>),
    }

    match Option::<MapOrList>::deserialize(deserializer)? {
        Some(MapOrList::Map(map)) => Ok(map),
        Some(MapOrList::List(list)) if list.is_empty() => Ok(Distribution::new()),
        Some(MapOrList::List(_)) => Err(de::Error::custom(
            "expected an object, found a non-empty array",
        )),
        None => Ok(Distribution::new()),
    }
}
