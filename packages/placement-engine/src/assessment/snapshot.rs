//! Session checkpointing
//!
//! A snapshot is the ordered response list plus coverage bookkeeping. On
//! restore the estimate is recomputed by replaying the responses through a
//! fresh estimator; the cached estimate is only checked against it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::bank::ItemBank;
use crate::assessment::config::AssessmentConfig;
use crate::assessment::placement::Curriculum;
use crate::assessment::selector::ItemSelector;
use crate::assessment::session::AssessmentSession;
use crate::assessment::types::{
    AbilityEstimate, Category, ItemId, Response, SessionStatus, StopReason,
};
use crate::error::{AssessmentResult, SnapshotError};

pub const SNAPSHOT_VERSION: u32 = 1;

const ESTIMATE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub version: u32,
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub responses: Vec<Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outstanding_item: Option<ItemId>,
    #[serde(default)]
    pub covered_categories: BTreeMap<Category, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_estimate: Option<AbilityEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> AssessmentResult<String> {
        serde_json::to_string(self).map_err(|source| SnapshotError::Json(source).into())
    }

    pub fn from_json(json: &str) -> AssessmentResult<Self> {
        serde_json::from_str(json).map_err(|source| SnapshotError::Json(source).into())
    }
}

pub fn serialize_session(session: &AssessmentSession) -> SessionSnapshot {
    SessionSnapshot {
        version: SNAPSHOT_VERSION,
        session_id: session.id(),
        status: session.status(),
        responses: session.responses(),
        outstanding_item: session.outstanding_item(),
        covered_categories: session.coverage().counts().clone(),
        cached_estimate: Some(session.estimate()),
        stop_reason: session.stop_reason(),
        taken_at: Utc::now(),
    }
}

/// Rebuild a session from a snapshot against the same bank and configuration.
///
/// Every response is replayed through the normal update path, and no stopping
/// rule may fire before the last one. An outstanding item must be the one the
/// selector picks for the replayed state.
pub fn restore_session(
    snapshot: &SessionSnapshot,
    bank: Arc<ItemBank>,
    curriculum: Arc<Curriculum>,
    config: Arc<AssessmentConfig>,
) -> AssessmentResult<AssessmentSession> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version).into());
    }
    config.validate_for_bank(&bank)?;

    let inconsistent = || SnapshotError::InconsistentStatus(snapshot.status);
    let mut session = AssessmentSession::with_id(snapshot.session_id, Arc::clone(&bank), curriculum, config);

    if snapshot.status == SessionStatus::Created {
        if !snapshot.responses.is_empty() || snapshot.outstanding_item.is_some() {
            return Err(inconsistent().into());
        }
        return Ok(session);
    }

    session.mark_in_progress();
    for response in &snapshot.responses {
        let item = bank
            .get(response.item_id)
            .ok_or(SnapshotError::UnknownItem(response.item_id))?;
        if session.administered_ids().contains(&item.id()) {
            return Err(SnapshotError::DuplicateItem(item.id()).into());
        }
        if session.pending_stop().is_some() {
            return Err(inconsistent().into());
        }
        response.validate()?;
        session.apply_response(item, response.clone());
    }

    if &snapshot.covered_categories != session.coverage().counts() {
        return Err(SnapshotError::CoverageMismatch.into());
    }

    if let Some(cached) = &snapshot.cached_estimate {
        let recomputed = session.estimate();
        let theta_drift = (cached.theta - recomputed.theta).abs();
        let se_drift = (cached.standard_error - recomputed.standard_error).abs();
        if !(theta_drift <= ESTIMATE_TOLERANCE && se_drift <= ESTIMATE_TOLERANCE) {
            return Err(SnapshotError::EstimateMismatch {
                cached: cached.theta,
                recomputed: recomputed.theta,
            }
            .into());
        }
    }

    let pending = session.pending_stop();
    match snapshot.status {
        SessionStatus::InProgress => {
            if pending.is_some() || snapshot.stop_reason.is_some() {
                return Err(inconsistent().into());
            }
            if let Some(id) = snapshot.outstanding_item {
                let expected = ItemSelector::select(
                    &bank,
                    session.estimate().theta,
                    session.administered_ids(),
                    session.coverage(),
                )
                .map(|item| item.id());
                if expected != Some(id) {
                    return Err(SnapshotError::InvalidOutstanding(id).into());
                }
                session.set_outstanding(id);
            }
        }
        SessionStatus::Completed => {
            let reason = pending.ok_or_else(inconsistent)?;
            if snapshot.outstanding_item.is_some()
                || snapshot.stop_reason.is_some_and(|cached| cached != reason)
            {
                return Err(inconsistent().into());
            }
            session.finalize(reason);
        }
        SessionStatus::Created => {}
    }

    tracing::info!(
        session_id = %snapshot.session_id,
        status = snapshot.status.as_str(),
        responses = snapshot.responses.len(),
        "session restored"
    );
    Ok(session)
}
