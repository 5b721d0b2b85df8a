//! Export formats, their header signatures and destination tables.
//!
//! Every recognised export shape is a [`SchemaType`]. Classification is
//! driven entirely by the declarative [`SIGNATURES`] table: a document claims
//! the first type, in precedence order, whose required header tokens are all
//! present. Adding a format is a matter of adding a row here plus its field
//! descriptors in [`crate::fields`].
//!
//! Destination table and conflict key travel together in [`TableSpec`] so a
//! table can never be paired with another table's key.

use std::{collections::HashSet, fmt, str::FromStr};

use anyhow::anyhow;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{error::IngestError, parser::RawDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    Overview,
    Content,
    Viewers,
    FollowerGrowth,
    #[serde(rename = "gender")]
    GenderDemographics,
    #[serde(rename = "territory")]
    TerritoryDemographics,
    ActiveHours,
    #[serde(rename = "social_stat")]
    BulkSocialStat,
}

impl SchemaType {
    /// The CSV export family, in classifier precedence order.
    pub const CSV: [SchemaType; 7] = [
        SchemaType::Overview,
        SchemaType::Content,
        SchemaType::Viewers,
        SchemaType::FollowerGrowth,
        SchemaType::GenderDemographics,
        SchemaType::TerritoryDemographics,
        SchemaType::ActiveHours,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Overview => "overview",
            SchemaType::Content => "content",
            SchemaType::Viewers => "viewers",
            SchemaType::FollowerGrowth => "follower_growth",
            SchemaType::GenderDemographics => "gender",
            SchemaType::TerritoryDemographics => "territory",
            SchemaType::ActiveHours => "active_hours",
            SchemaType::BulkSocialStat => "social_stat",
        }
    }

    /// Position of this type in the CSV slot arena; `None` for the JSON family.
    pub fn slot_index(&self) -> Option<usize> {
        Self::CSV.iter().position(|candidate| candidate == self)
    }

    pub fn table(&self) -> &'static TableSpec {
        match self {
            SchemaType::Overview => &OVERVIEW_TABLE,
            SchemaType::Content => &CONTENT_TABLE,
            SchemaType::Viewers => &VIEWERS_TABLE,
            SchemaType::FollowerGrowth => &FOLLOWER_GROWTH_TABLE,
            SchemaType::GenderDemographics => &GENDER_TABLE,
            SchemaType::TerritoryDemographics => &TERRITORY_TABLE,
            SchemaType::ActiveHours => &ACTIVE_HOURS_TABLE,
            SchemaType::BulkSocialStat => &SOCIAL_STATS_TABLE,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "overview" => Ok(SchemaType::Overview),
            "content" => Ok(SchemaType::Content),
            "viewers" => Ok(SchemaType::Viewers),
            "follower_growth" | "followers" => Ok(SchemaType::FollowerGrowth),
            "gender" | "gender_demographics" => Ok(SchemaType::GenderDemographics),
            "territory" | "territories" | "territory_demographics" => {
                Ok(SchemaType::TerritoryDemographics)
            }
            "active_hours" | "hours" => Ok(SchemaType::ActiveHours),
            "social_stat" | "bulk" | "bulk_social_stat" => Ok(SchemaType::BulkSocialStat),
            _ => Err(anyhow!(
                "Unknown schema type '{value}'. Supported types: {}",
                SchemaType::CSV.iter().map(SchemaType::as_str).join(", ")
            )),
        }
    }
}

/// Destination table and the columns that identify one observation in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub conflict_key: &'static [&'static str],
}

impl TableSpec {
    /// Table name with an optional deployment prefix applied.
    pub fn qualified_name(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(prefix) => format!("{prefix}{}", self.name),
            None => self.name.to_string(),
        }
    }
}

static OVERVIEW_TABLE: TableSpec = TableSpec {
    name: "overview",
    conflict_key: &["snapshot_date"],
};
static CONTENT_TABLE: TableSpec = TableSpec {
    name: "content",
    conflict_key: &["video_title", "snapshot_date"],
};
static VIEWERS_TABLE: TableSpec = TableSpec {
    name: "viewers",
    conflict_key: &["snapshot_date"],
};
static FOLLOWER_GROWTH_TABLE: TableSpec = TableSpec {
    name: "follower_growth",
    conflict_key: &["snapshot_date"],
};
static GENDER_TABLE: TableSpec = TableSpec {
    name: "gender_demographics",
    conflict_key: &["snapshot_date", "gender"],
};
static TERRITORY_TABLE: TableSpec = TableSpec {
    name: "territory_demographics",
    conflict_key: &["snapshot_date", "territory"],
};
static ACTIVE_HOURS_TABLE: TableSpec = TableSpec {
    name: "active_hours",
    conflict_key: &["snapshot_date", "hour"],
};
static SOCIAL_STATS_TABLE: TableSpec = TableSpec {
    name: "social_stats",
    conflict_key: &["platform", "snapshot_date"],
};

#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub schema: SchemaType,
    pub required: &'static [&'static str],
}

/// Header signatures in precedence order. Tokens are lower-case.
pub static SIGNATURES: [Signature; 7] = [
    Signature {
        schema: SchemaType::Overview,
        required: &["date", "video views", "profile views"],
    },
    Signature {
        schema: SchemaType::Content,
        required: &["video title", "post time"],
    },
    Signature {
        schema: SchemaType::Viewers,
        required: &["date", "new viewers", "returning viewers"],
    },
    Signature {
        schema: SchemaType::FollowerGrowth,
        required: &["date", "followers", "difference in followers from previous day"],
    },
    Signature {
        schema: SchemaType::GenderDemographics,
        required: &["gender", "distribution"],
    },
    Signature {
        schema: SchemaType::TerritoryDemographics,
        required: &["top territories", "distribution"],
    },
    Signature {
        schema: SchemaType::ActiveHours,
        required: &["hour", "active followers"],
    },
];

/// Classifies a header set. Headers are trimmed and lower-cased here, so
/// callers may pass them raw.
pub fn classify<S: AsRef<str>>(headers: &[S]) -> Option<SchemaType> {
    let present = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect::<HashSet<_>>();
    SIGNATURES
        .iter()
        .find(|signature| {
            signature
                .required
                .iter()
                .all(|token| present.contains(*token))
        })
        .map(|signature| signature.schema)
}

/// Classifies `doc` and checks the result against the slot the operator
/// declared. Nothing downstream runs unless this succeeds.
pub fn validate_declared(doc: &RawDocument, declared: SchemaType) -> Result<SchemaType, IngestError> {
    match classify(doc.headers()) {
        Some(detected) if detected == declared => Ok(detected),
        Some(detected) => Err(IngestError::ClassificationMismatch { detected, declared }),
        None => Err(IngestError::UnrecognizedSchema {
            headers: doc.headers().iter().join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognises_overview_export() {
        let headers = ["Date", "Video Views", "Profile Views", "Likes", "Comments", "Shares"];
        assert_eq!(classify(&headers), Some(SchemaType::Overview));
    }

    #[test]
    fn classify_recognises_demographic_exports() {
        assert_eq!(
            classify(&["Top territories", "Distribution"]),
            Some(SchemaType::TerritoryDemographics)
        );
        assert_eq!(
            classify(&[" Gender ", "Distribution"]),
            Some(SchemaType::GenderDemographics)
        );
    }

    #[test]
    fn classify_returns_none_for_unknown_headers() {
        assert_eq!(classify(&["Date", "Followers"]), None);
        assert_eq!(classify::<&str>(&[]), None);
    }

    #[test]
    fn precedence_prefers_earlier_signature() {
        let headers = [
            "Date",
            "Video Views",
            "Profile Views",
            "Gender",
            "Distribution",
        ];
        assert_eq!(classify(&headers), Some(SchemaType::Overview));
    }

    #[test]
    fn every_signature_is_reachable_on_its_own() {
        for signature in &SIGNATURES {
            assert_eq!(classify(signature.required), Some(signature.schema));
        }
    }

    #[test]
    fn conflict_keys_are_never_empty() {
        for schema in SchemaType::CSV.iter().chain([&SchemaType::BulkSocialStat]) {
            assert!(!schema.table().conflict_key.is_empty(), "{schema}");
        }
    }

    #[test]
    fn schema_type_parses_slot_names() {
        for schema in SchemaType::CSV {
            assert_eq!(schema.as_str().parse::<SchemaType>().unwrap(), schema);
        }
        assert_eq!(
            "Follower-Growth".parse::<SchemaType>().unwrap(),
            SchemaType::FollowerGrowth
        );
        assert!("likes".parse::<SchemaType>().is_err());
    }

    #[test]
    fn qualified_name_applies_prefix() {
        let table = SchemaType::Overview.table();
        assert_eq!(table.qualified_name(None), "overview");
        assert_eq!(table.qualified_name(Some("tiktok_")), "tiktok_overview");
    }
}
