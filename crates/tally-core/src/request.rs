//! Request and response shapes for front ends.
//!
//! These are the JSON bodies the HTTP service and CLI exchange:
//!
//! ```json
//! {"start_time": "2022-09-01T00:00:00", "end_time": "2022-12-31T23:59:00", "group_type": "month"}
//! ```
//!
//! answered by
//!
//! ```json
//! {"dataset": [5906586, 5515874, 5889803, 6092634],
//!  "labels": ["2022-09-01T00:00:00+00:00", "2022-10-01T00:00:00+00:00",
//!             "2022-11-01T00:00:00+00:00", "2022-12-01T00:00:00+00:00"]}
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use tally_types::{AggregationResult, Amount, GroupType};

use crate::aggregate::RangeAggregator;
use crate::error::Result;
use crate::timestamp::{TimeInput, to_iso};
use crate::traits::RecordStore;

/// An aggregation request.
///
/// `group_type` is kept as raw text so that a missing or unknown value is
/// reported with the list of accepted literals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregateRequest {
    /// Window start, inclusive.
    #[serde(alias = "dt_from")]
    pub start_time: TimeInput,
    /// Window end, inclusive.
    #[serde(alias = "dt_upto")]
    pub end_time: TimeInput,
    /// One of `year`, `month`, `day`, `hour`.
    #[serde(default)]
    pub group_type: Option<String>,
}

impl AggregateRequest {
    pub fn new(
        start_time: impl Into<TimeInput>,
        end_time: impl Into<TimeInput>,
        group_type: GroupType,
    ) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            group_type: Some(group_type.as_str().to_string()),
        }
    }
}

/// Bucket totals with their ISO-8601 labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub dataset: Vec<Amount>,
    pub labels: Vec<String>,
}

impl AggregateResponse {
    /// Render a result, with or without the `+00:00` suffix on labels.
    pub fn from_result(result: &AggregationResult, drop_timezone: bool) -> Self {
        Self {
            dataset: result.dataset().to_vec(),
            labels: result
                .labels()
                .iter()
                .map(|ts| to_iso(*ts, drop_timezone))
                .collect(),
        }
    }
}

impl<S: RecordStore> RangeAggregator<S> {
    /// Validate and run a request.
    pub async fn handle(
        &self,
        request: AggregateRequest,
        drop_timezone: bool,
    ) -> Result<AggregateResponse> {
        let group_type = GroupType::parse_raw(request.group_type.as_deref()).inspect_err(|e| {
            warn!("Rejected aggregate request: {}", e);
        })?;
        let result = self
            .aggregate(request.start_time, request.end_time, group_type)
            .await?;
        Ok(AggregateResponse::from_result(&result, drop_timezone))
    }
}
