//! Session Controller
//!
//! `Created -> InProgress -> Completed`. One item is outstanding at a time and
//! a response is only accepted for that item, so a late or duplicate response
//! cannot be applied twice. Stopping rules are evaluated after every recorded
//! response and again before each selection.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::assessment::bank::{Item, ItemBank};
use crate::assessment::config::AssessmentConfig;
use crate::assessment::estimator::AbilityEstimator;
use crate::assessment::placement::{Curriculum, PlacementMapper, PlacementResult};
use crate::assessment::selector::{CoverageTracker, ItemSelector};
use crate::assessment::types::{
    AbilityEstimate, AdministeredItem, ItemId, Response, SessionStatus, StopReason,
};
use crate::error::{AssessmentResult, ConfigError, SessionStateError};

/// The UI collaborator: shows an item and reports the learner's response
pub trait ItemPresenter {
    fn present(&mut self, item: &Item) -> Response;
}

impl<F> ItemPresenter for F
where
    F: FnMut(&Item) -> Response,
{
    fn present(&mut self, item: &Item) -> Response {
        self(item)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    Present(Item),
    Finished(PlacementResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseReceipt {
    pub estimate: AbilityEstimate,
    /// Set when this response triggered a stopping rule
    pub finished: Option<PlacementResult>,
}

#[derive(Debug, Clone)]
pub struct AssessmentSession {
    id: Uuid,
    bank: Arc<ItemBank>,
    curriculum: Arc<Curriculum>,
    config: Arc<AssessmentConfig>,
    status: SessionStatus,
    estimator: AbilityEstimator,
    coverage: CoverageTracker,
    administered: Vec<AdministeredItem>,
    administered_ids: BTreeSet<ItemId>,
    outstanding: Option<ItemId>,
    stop_reason: Option<StopReason>,
    result: Option<PlacementResult>,
    created_at: DateTime<Utc>,
}

impl AssessmentSession {
    pub fn new(
        bank: Arc<ItemBank>,
        curriculum: Arc<Curriculum>,
        config: Arc<AssessmentConfig>,
    ) -> AssessmentResult<Self> {
        config.validate_for_bank(&bank)?;
        Ok(Self::with_id(Uuid::new_v4(), bank, curriculum, config))
    }

    /// Build without validation; callers have already checked the config
    pub(crate) fn with_id(
        id: Uuid,
        bank: Arc<ItemBank>,
        curriculum: Arc<Curriculum>,
        config: Arc<AssessmentConfig>,
    ) -> Self {
        let estimator = AbilityEstimator::new(&config.estimator);
        let coverage = CoverageTracker::new(config.mandatory_categories());
        Self {
            id,
            bank,
            curriculum,
            config,
            status: SessionStatus::Created,
            estimator,
            coverage,
            administered: Vec::new(),
            administered_ids: BTreeSet::new(),
            outstanding: None,
            stop_reason: None,
            result: None,
            created_at: Utc::now(),
        }
    }

    // ==================== Lifecycle ====================

    pub fn start(&mut self) -> AssessmentResult<()> {
        match self.status {
            SessionStatus::Created => {}
            SessionStatus::InProgress => return Err(SessionStateError::AlreadyStarted.into()),
            SessionStatus::Completed => return Err(SessionStateError::Completed.into()),
        }

        let theta = self.estimator.estimate().theta;
        if ItemSelector::select(&self.bank, theta, &self.administered_ids, &self.coverage).is_none()
        {
            return Err(ConfigError::NoEligibleItems.into());
        }

        self.status = SessionStatus::InProgress;
        tracing::info!(
            session_id = %self.id,
            bank_size = self.bank.len(),
            max_items = self.config.stopping.max_items,
            "placement session started"
        );
        Ok(())
    }

    /// The item to present next, or the placement once a stopping rule fires.
    ///
    /// Asking again while an item is outstanding returns that same item.
    pub fn next_item(&mut self) -> AssessmentResult<NextStep> {
        self.ensure_in_progress()?;

        if let Some(id) = self.outstanding {
            let item = self
                .bank
                .get(id)
                .ok_or(SessionStateError::NoOutstandingItem)?;
            return Ok(NextStep::Present(item.clone()));
        }

        if let Some(reason) = self.pending_stop() {
            return Ok(NextStep::Finished(self.finalize(reason)));
        }

        let theta = self.estimator.estimate().theta;
        match ItemSelector::select(&self.bank, theta, &self.administered_ids, &self.coverage) {
            Some(item) => {
                let item = item.clone();
                self.outstanding = Some(item.id());
                tracing::debug!(
                    session_id = %self.id,
                    item_id = item.id(),
                    category = %item.category(),
                    theta,
                    "item selected"
                );
                Ok(NextStep::Present(item))
            }
            None => Ok(NextStep::Finished(self.finalize(StopReason::BankExhausted))),
        }
    }

    pub fn record_response(&mut self, response: Response) -> AssessmentResult<ResponseReceipt> {
        self.ensure_in_progress()?;

        let expected = self.outstanding.ok_or(SessionStateError::NoOutstandingItem)?;
        if response.item_id != expected {
            return Err(SessionStateError::UnexpectedItem {
                expected,
                received: response.item_id,
            }
            .into());
        }
        if let Err(err) = response.validate() {
            tracing::warn!(session_id = %self.id, item_id = expected, error = %err, "response rejected");
            return Err(err.into());
        }

        let bank = Arc::clone(&self.bank);
        let item = bank
            .get(expected)
            .ok_or(SessionStateError::NoOutstandingItem)?;
        let estimate = self.apply_response(item, response);

        let finished = self.pending_stop().map(|reason| self.finalize(reason));
        Ok(ResponseReceipt { estimate, finished })
    }

    /// Drive the select, present, record loop to completion
    pub fn run<P>(&mut self, presenter: &mut P) -> AssessmentResult<PlacementResult>
    where
        P: ItemPresenter + ?Sized,
    {
        if self.status == SessionStatus::Created {
            self.start()?;
        }

        loop {
            let item = match self.next_item()? {
                NextStep::Present(item) => item,
                NextStep::Finished(result) => return Ok(result),
            };
            let response = presenter.present(&item);
            if let Some(result) = self.record_response(response)?.finished {
                return Ok(result);
            }
        }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn estimate(&self) -> AbilityEstimate {
        self.estimator.estimate()
    }

    pub fn estimator(&self) -> &AbilityEstimator {
        &self.estimator
    }

    /// Estimate after each recorded response, in order
    pub fn trajectory(&self) -> Vec<AbilityEstimate> {
        self.administered.iter().map(|record| record.estimate).collect()
    }

    pub fn administered(&self) -> &[AdministeredItem] {
        &self.administered
    }

    pub fn administered_ids(&self) -> &BTreeSet<ItemId> {
        &self.administered_ids
    }

    pub fn responses(&self) -> Vec<Response> {
        self.administered
            .iter()
            .map(|record| record.response.clone())
            .collect()
    }

    pub fn coverage(&self) -> &CoverageTracker {
        &self.coverage
    }

    pub fn outstanding_item(&self) -> Option<ItemId> {
        self.outstanding
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn result(&self) -> Option<&PlacementResult> {
        self.result.as_ref()
    }

    pub fn bank(&self) -> &Arc<ItemBank> {
        &self.bank
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ==================== Internals ====================

    fn ensure_in_progress(&self) -> Result<(), SessionStateError> {
        match self.status {
            SessionStatus::Created => Err(SessionStateError::NotStarted),
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Completed => Err(SessionStateError::Completed),
        }
    }

    /// Fold a response into the estimate and bookkeeping. No stop evaluation.
    pub(crate) fn apply_response(&mut self, item: &Item, response: Response) -> AbilityEstimate {
        let estimate = self
            .estimator
            .update(item.params(), response.outcome.score());

        tracing::debug!(
            session_id = %self.id,
            item_id = item.id(),
            score = response.outcome.score(),
            skipped = response.outcome.is_skipped(),
            theta = estimate.theta,
            se = estimate.standard_error,
            "response recorded"
        );

        self.coverage.record(item.category());
        self.administered_ids.insert(item.id());
        self.administered.push(AdministeredItem {
            item_id: item.id(),
            category: item.category().clone(),
            params: item.params(),
            response,
            estimate,
        });
        self.outstanding = None;
        estimate
    }

    /// First stopping rule that holds, in order: item cap, precision, exhaustion
    pub(crate) fn pending_stop(&self) -> Option<StopReason> {
        let stopping = &self.config.stopping;
        if self.administered.len() as u32 >= stopping.max_items {
            return Some(StopReason::MaxItems);
        }

        let estimate = self.estimator.estimate();
        if self.estimator.is_converged()
            && estimate.standard_error < stopping.se_threshold
            && !ItemSelector::has_pending_coverage(&self.bank, &self.administered_ids, &self.coverage)
        {
            return Some(StopReason::PrecisionReached);
        }

        if ItemSelector::select(&self.bank, estimate.theta, &self.administered_ids, &self.coverage)
            .is_none()
        {
            return Some(StopReason::BankExhausted);
        }

        None
    }

    pub(crate) fn finalize(&mut self, reason: StopReason) -> PlacementResult {
        let estimate = self.estimator.estimate();
        let result = PlacementMapper::place(
            &self.config,
            &self.curriculum,
            &self.administered,
            &estimate,
            reason,
        );

        self.status = SessionStatus::Completed;
        self.stop_reason = Some(reason);
        self.outstanding = None;
        self.result = Some(result.clone());

        tracing::info!(
            session_id = %self.id,
            reason = reason.as_str(),
            items = self.administered.len(),
            theta = estimate.theta,
            se = estimate.standard_error,
            level = result.level,
            "placement session completed"
        );
        result
    }

    pub(crate) fn mark_in_progress(&mut self) {
        self.status = SessionStatus::InProgress;
    }

    pub(crate) fn set_outstanding(&mut self, item_id: ItemId) {
        self.outstanding = Some(item_id);
    }
}
