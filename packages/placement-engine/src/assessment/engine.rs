use std::sync::Arc;

use parking_lot::Mutex;

use crate::assessment::bank::ItemBank;
use crate::assessment::config::AssessmentConfig;
use crate::assessment::placement::Curriculum;
use crate::assessment::session::{AssessmentSession, NextStep, ResponseReceipt};
use crate::assessment::snapshot::{self, SessionSnapshot};
use crate::assessment::types::Response;
use crate::error::AssessmentResult;

/// Shared, read-only assessment context. Cheap to clone; sessions created
/// from it share the bank and curriculum and run independently.
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    bank: Arc<ItemBank>,
    curriculum: Arc<Curriculum>,
    config: Arc<AssessmentConfig>,
}

impl PlacementEngine {
    pub fn new(
        bank: ItemBank,
        curriculum: Curriculum,
        config: AssessmentConfig,
    ) -> AssessmentResult<Self> {
        config.validate_for_bank(&bank)?;
        Ok(Self {
            bank: Arc::new(bank),
            curriculum: Arc::new(curriculum),
            config: Arc::new(config),
        })
    }

    /// Bundled sample bank and curriculum
    pub fn with_sample_data(config: AssessmentConfig) -> AssessmentResult<Self> {
        Self::new(ItemBank::sample()?, Curriculum::sample()?, config)
    }

    pub fn bank(&self) -> &Arc<ItemBank> {
        &self.bank
    }

    pub fn curriculum(&self) -> &Arc<Curriculum> {
        &self.curriculum
    }

    pub fn config(&self) -> &Arc<AssessmentConfig> {
        &self.config
    }

    pub fn new_session(&self) -> AssessmentResult<AssessmentSession> {
        AssessmentSession::new(
            Arc::clone(&self.bank),
            Arc::clone(&self.curriculum),
            Arc::clone(&self.config),
        )
    }

    pub fn start_session(&self) -> AssessmentResult<AssessmentSession> {
        let mut session = self.new_session()?;
        session.start()?;
        Ok(session)
    }

    pub fn serialize_session(&self, session: &AssessmentSession) -> SessionSnapshot {
        snapshot::serialize_session(session)
    }

    pub fn restore_session(&self, snapshot: &SessionSnapshot) -> AssessmentResult<AssessmentSession> {
        snapshot::restore_session(
            snapshot,
            Arc::clone(&self.bank),
            Arc::clone(&self.curriculum),
            Arc::clone(&self.config),
        )
    }

    pub fn shared(&self, session: AssessmentSession) -> SharedSession {
        SharedSession::new(session)
    }
}

// ==================== Single Writer ====================

/// Handle for event-driven hosts where responses arrive from callbacks.
///
/// Every transition takes the lock, so concurrent callers are serialized and
/// a late or duplicate response is rejected by the session itself.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<AssessmentSession>>,
}

impl SharedSession {
    pub fn new(session: AssessmentSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn start(&self) -> AssessmentResult<()> {
        self.inner.lock().start()
    }

    pub fn next_item(&self) -> AssessmentResult<NextStep> {
        self.inner.lock().next_item()
    }

    pub fn record_response(&self, response: Response) -> AssessmentResult<ResponseReceipt> {
        self.inner.lock().record_response(response)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        snapshot::serialize_session(&self.inner.lock())
    }

    /// Run `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut AssessmentSession) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
