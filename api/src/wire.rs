//! Provider wire types: serde shapes for the per-sport event records.
//! Every field is optional. Providers omit freely, and the normalizers decide
//! what is required. A field holding the wrong JSON type reads as absent, so
//! one odd value never costs the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Envelope keys that may hold the event array, checked in this order.
/// The first key whose value is an array wins, even if that array is empty.
pub const EVENT_ARRAY_KEYS: [&str; 3] = ["events", "response", "event"];

/// Pull the event array out of a provider envelope.
pub fn unwrap_events(body: &Value) -> Option<&Vec<Value>> {
    EVENT_ARRAY_KEYS
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
}

/// Provider-reported failure on an otherwise successful response
/// (api-sports answers 200 with `"errors": {"requests": "..."}` when rate limited).
pub fn provider_errors(body: &Value) -> Option<String> {
    match body.get("errors")? {
        Value::Object(map) if !map.is_empty() => Some(
            map.iter()
                .map(|(k, v)| match v.as_str() {
                    Some(s) => format!("{k}: {s}"),
                    None => format!("{k}: {v}"),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

/// Identifiers arrive as numbers from some endpoints and strings from others.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Text(String),
}

impl WireId {
    /// Render as a string id; blank strings are treated as missing.
    pub fn render(&self) -> Option<String> {
        match self {
            WireId::Int(n) => Some(n.to_string()),
            WireId::Text(s) if s.trim().is_empty() => None,
            WireId::Text(s) => Some(s.trim().to_owned()),
        }
    }
}

/// Reads an optional field, mapping a mistyped value to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Usually `{long, short}`; a few endpoints send the short code as a bare string.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum WireStatus {
    Text(String),
    Detail {
        #[serde(default, deserialize_with = "lenient")]
        long: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        short: Option<String>,
    },
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireLeague {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<WireId>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireSide {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<WireId>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireTeams {
    #[serde(default, deserialize_with = "lenient")]
    pub home: Option<WireSide>,
    #[serde(default, deserialize_with = "lenient")]
    pub away: Option<WireSide>,
}

/// Some endpoints send the venue as a bare name, others as an object.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum WireVenue {
    Name(String),
    Detail {
        #[serde(default, deserialize_with = "lenient")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        city: Option<String>,
    },
}

impl WireVenue {
    pub fn display(&self) -> Option<String> {
        let name = match self {
            WireVenue::Name(name) => Some(name.clone()),
            WireVenue::Detail { name: Some(name), .. } => Some(name.clone()),
            WireVenue::Detail { name: None, city } => city.clone(),
        };
        name.filter(|s| !s.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Fixture-based schema (soccer)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FixtureRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub fixture: Option<FixtureCore>,
    #[serde(default, deserialize_with = "lenient")]
    pub league: Option<WireLeague>,
    #[serde(default, deserialize_with = "lenient")]
    pub teams: Option<WireTeams>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FixtureCore {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<WireId>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>, // ISO 8601 with offset
    #[serde(default, deserialize_with = "lenient")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<WireStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub venue: Option<WireVenue>,
}

// ---------------------------------------------------------------------------
// Game-based schema (basketball, american football)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct GameRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<WireId>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<String>, // "19:30", sometimes absent
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<WireStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub league: Option<WireLeague>,
    #[serde(default, deserialize_with = "lenient")]
    pub teams: Option<WireTeams>,
    #[serde(default, deserialize_with = "lenient")]
    pub venue: Option<WireVenue>,
}

// ---------------------------------------------------------------------------
// Fight-based schema (combat sports)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FightRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<WireId>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub slug: Option<String>, // event card name, e.g. "UFC 301: Pantoja vs. Erceg"
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<WireStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub fighters: Option<WireFighters>,
    #[serde(default, deserialize_with = "lenient")]
    pub venue: Option<WireVenue>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireFighters {
    #[serde(default, deserialize_with = "lenient")]
    pub first: Option<WireSide>,
    #[serde(default, deserialize_with = "lenient")]
    pub second: Option<WireSide>,
}
