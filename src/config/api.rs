//! Stats API sections: `stats`, `api` and `policy`.
//!
//! These only appear in a document when the stats API is enabled. The API
//! listener itself is a dokodemo-door inbound routed to the `api` tag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::USER_LEVEL;

/// Enables traffic counters. Always serialized as `{}`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Stats {}

/// gRPC management API
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Api {
    pub tag: String,
    pub services: Vec<String>,
}

impl Api {
    /// Create an API section exposing only the stats service
    pub fn stats_service(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            services: vec!["StatsService".to_string()],
        }
    }
}

/// Counter policy per user level and for the whole system
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Policy {
    pub levels: BTreeMap<String, LevelPolicy>,
    pub system: SystemPolicy,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelPolicy {
    pub stats_user_uplink: bool,
    pub stats_user_downlink: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemPolicy {
    pub stats_inbound_uplink: bool,
    pub stats_inbound_downlink: bool,
    pub stats_outbound_uplink: bool,
    pub stats_outbound_downlink: bool,
}

impl Policy {
    /// Count traffic for the default user level and every inbound/outbound
    pub fn with_counters() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(
            USER_LEVEL.to_string(),
            LevelPolicy {
                stats_user_uplink: true,
                stats_user_downlink: true,
            },
        );

        Self {
            levels,
            system: SystemPolicy {
                stats_inbound_uplink: true,
                stats_inbound_downlink: true,
                stats_outbound_uplink: true,
                stats_outbound_downlink: true,
            },
        }
    }
}
