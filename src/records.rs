//! Typed records produced by normalization, one struct per schema type.
//!
//! Column names match the field descriptors in [`crate::fields`] and the
//! conflict keys in [`crate::schema`], so a record converts to and from a
//! store [`Row`] through serde without any per-type mapping code.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{schema::SchemaType, store::Row};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRecord {
    pub snapshot_date: NaiveDate,
    pub video_views: i64,
    pub profile_views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub video_title: String,
    pub video_link: Option<String>,
    pub post_date: Option<NaiveDate>,
    pub snapshot_date: NaiveDate,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewersRecord {
    pub snapshot_date: NaiveDate,
    pub total_viewers: i64,
    pub new_viewers: i64,
    pub returning_viewers: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerGrowthRecord {
    pub snapshot_date: NaiveDate,
    pub followers: i64,
    pub daily_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderRecord {
    pub snapshot_date: NaiveDate,
    pub gender: String,
    pub distribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    pub snapshot_date: NaiveDate,
    pub territory: String,
    pub distribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveHoursRecord {
    pub snapshot_date: NaiveDate,
    pub hour: i64,
    pub active_followers: i64,
}

/// One platform's headline numbers from the JSON bulk export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialStatRecord {
    pub platform: String,
    pub snapshot_date: NaiveDate,
    pub followers: i64,
    pub engagement_rate: f64,
    pub following: i64,
    pub posts: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub views: i64,
    pub reach: i64,
    pub impressions: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Overview(OverviewRecord),
    Content(ContentRecord),
    Viewers(ViewersRecord),
    FollowerGrowth(FollowerGrowthRecord),
    Gender(GenderRecord),
    Territory(TerritoryRecord),
    ActiveHours(ActiveHoursRecord),
    SocialStat(SocialStatRecord),
}

impl NormalizedRecord {
    /// Builds the typed record for `schema` from an extracted row.
    pub fn from_row(schema: SchemaType, row: Row) -> Result<Self, serde_json::Error> {
        let value = Value::Object(row);
        Ok(match schema {
            SchemaType::Overview => Self::Overview(serde_json::from_value(value)?),
            SchemaType::Content => Self::Content(serde_json::from_value(value)?),
            SchemaType::Viewers => Self::Viewers(serde_json::from_value(value)?),
            SchemaType::FollowerGrowth => Self::FollowerGrowth(serde_json::from_value(value)?),
            SchemaType::GenderDemographics => Self::Gender(serde_json::from_value(value)?),
            SchemaType::TerritoryDemographics => Self::Territory(serde_json::from_value(value)?),
            SchemaType::ActiveHours => Self::ActiveHours(serde_json::from_value(value)?),
            SchemaType::BulkSocialStat => Self::SocialStat(serde_json::from_value(value)?),
        })
    }

    pub fn schema(&self) -> SchemaType {
        match self {
            Self::Overview(_) => SchemaType::Overview,
            Self::Content(_) => SchemaType::Content,
            Self::Viewers(_) => SchemaType::Viewers,
            Self::FollowerGrowth(_) => SchemaType::FollowerGrowth,
            Self::Gender(_) => SchemaType::GenderDemographics,
            Self::Territory(_) => SchemaType::TerritoryDemographics,
            Self::ActiveHours(_) => SchemaType::ActiveHours,
            Self::SocialStat(_) => SchemaType::BulkSocialStat,
        }
    }

    pub fn snapshot_date(&self) -> NaiveDate {
        match self {
            Self::Overview(r) => r.snapshot_date,
            Self::Content(r) => r.snapshot_date,
            Self::Viewers(r) => r.snapshot_date,
            Self::FollowerGrowth(r) => r.snapshot_date,
            Self::Gender(r) => r.snapshot_date,
            Self::Territory(r) => r.snapshot_date,
            Self::ActiveHours(r) => r.snapshot_date,
            Self::SocialStat(r) => r.snapshot_date,
        }
    }

    /// Column map handed to the persistence sink.
    pub fn to_row(&self) -> Result<Row, serde_json::Error> {
        let value = match self {
            Self::Overview(r) => serde_json::to_value(r)?,
            Self::Content(r) => serde_json::to_value(r)?,
            Self::Viewers(r) => serde_json::to_value(r)?,
            Self::FollowerGrowth(r) => serde_json::to_value(r)?,
            Self::Gender(r) => serde_json::to_value(r)?,
            Self::Territory(r) => serde_json::to_value(r)?,
            Self::ActiveHours(r) => serde_json::to_value(r)?,
            Self::SocialStat(r) => serde_json::to_value(r)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Err(serde::de::Error::custom(format!(
                "record serialized to {other} instead of an object"
            ))),
        }
    }
}
