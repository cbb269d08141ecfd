//! YAML configuration: the source catalog and the brief profile.
//!
//! Two files are read at startup:
//!
//! ```yaml
//! # sources.yaml: categories map to ordered source lists
//! tech:
//!   - { name: "Vendor Blog", url: "https://example.com/feed", type: rss, weight: 1.2 }
//!   - { name: "Status Page", url: "https://status.example.com", type: page }
//!
//! # profile.yaml
//! meta:
//!   audience: "Leadership team"
//!   org_priorities: ["Reliability"]
//!   coverage_days: 30
//!   timezone: Asia/Singapore
//! scoring:
//!   base_source_weight: { tech: 1.5 }
//!   keywords: { critical: 2.0 }
//! ```
//!
//! Category order and entry order are kept exactly as written; collection
//! order (and therefore which duplicate survives) depends on it.

use crate::errors::ConfigError;
use crate::models::{SourceDescriptor, SourceKind};
use chrono_tz::Tz;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use tracing::{info, instrument};

pub const DEFAULT_TIMEZONE: &str = "Asia/Singapore";

/// Scoring inputs: per-category base weight and keyword multipliers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringWeights {
    #[serde(default)]
    pub base_source_weight: BTreeMap<String, f64>,
    #[serde(default)]
    pub keywords: BTreeMap<String, f64>,
}

/// Report metadata and the coverage window.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileMeta {
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub org_priorities: Vec<String>,
    #[serde(default = "default_coverage_days")]
    pub coverage_days: i64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_coverage_days() -> i64 {
    30
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

/// Contents of `profile.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: ProfileMeta,
    #[serde(default)]
    pub scoring: ScoringWeights,
}

impl Profile {
    /// Resolve the configured IANA timezone name.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.meta
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.meta.timezone.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: String,
    url: String,
    #[serde(rename = "type", default = "default_source_type")]
    kind: String,
    #[serde(default = "default_source_weight")]
    weight: f64,
}

fn default_source_type() -> String {
    "rss".to_string()
}

fn default_source_weight() -> f64 {
    1.0
}

/// Category → sources, in document order.
struct SourceGroups(Vec<(String, Vec<RawSource>)>);

impl<'de> Deserialize<'de> for SourceGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = SourceGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of category names to source lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((category, sources)) =
                    map.next_entry::<String, Option<Vec<RawSource>>>()?
                {
                    groups.push((category, sources.unwrap_or_default()));
                }
                Ok(SourceGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

pub(crate) fn read_file(path: &str) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })
}

/// Parse a profile document. `origin` only labels errors.
pub fn parse_profile(yaml: &str, origin: &str) -> Result<Profile, ConfigError> {
    let profile: Profile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        path: origin.to_string(),
        source,
    })?;
    if profile.meta.coverage_days < 0 {
        return Err(ConfigError::InvalidWindow(profile.meta.coverage_days));
    }
    profile.timezone()?;
    Ok(profile)
}

/// Parse a source catalog into a flat, declaration-ordered descriptor list.
pub fn parse_sources(yaml: &str, origin: &str) -> Result<Vec<SourceDescriptor>, ConfigError> {
    let groups: SourceGroups = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        path: origin.to_string(),
        source,
    })?;

    let descriptors: Vec<SourceDescriptor> = groups
        .0
        .into_iter()
        .flat_map(|(category, sources)| {
            sources.into_iter().map(move |raw| SourceDescriptor {
                category: category.clone(),
                name: raw.name,
                kind: SourceKind::from_type(&raw.kind),
                url: raw.url,
                weight: raw.weight,
            })
        })
        .collect();

    if descriptors.is_empty() {
        return Err(ConfigError::NoSources);
    }
    Ok(descriptors)
}

#[instrument(level = "info", skip_all, fields(%path))]
pub fn load_profile(path: &str) -> Result<Profile, ConfigError> {
    let profile = parse_profile(&read_file(path)?, path)?;
    info!(
        coverage_days = profile.meta.coverage_days,
        timezone = %profile.meta.timezone,
        keywords = profile.scoring.keywords.len(),
        "Loaded profile"
    );
    Ok(profile)
}

#[instrument(level = "info", skip_all, fields(%path))]
pub fn load_sources(path: &str) -> Result<Vec<SourceDescriptor>, ConfigError> {
    let sources = parse_sources(&read_file(path)?, path)?;
    info!(count = sources.len(), "Loaded source catalog");
    Ok(sources)
}
