//! # Batch Lifecycle State Machine
//!
//! Reserves storage capacity on the gateway and waits until the reservation
//! can stamp uploads.
//!
//! ## State Machine
//!
//! ```text
//! Requested → ReferenceObtained → IdentifierPending → IdentifierResolved
//!                                        ↓                    ↓
//!                                     TimedOut ← UsabilityPending → Usable
//! ```
//!
//! Both pending states poll on a fixed interval under a wall-clock budget.
//! Every iteration checks the budget first, then sleeps one interval, then
//! polls. Time comes from an injected [`Clock`] and [`Timer`], so tests run
//! the seven minute budget instantly with a
//! [`ManualClock`](bridge_traits::time::ManualClock).

use bridge_traits::gateway::{BatchId, BatchReference, PostageGateway};
use bridge_traits::time::{Clock, Timer};
use chrono::{DateTime, Utc};
use core_runtime::config::BatchSettings;
use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{PublishError, Result};

/// Lifecycle state of one capacity reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Requested,
    ReferenceObtained,
    IdentifierPending,
    IdentifierResolved,
    UsabilityPending,
    Usable,
    TimedOut,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Requested => "requested",
            BatchState::ReferenceObtained => "reference_obtained",
            BatchState::IdentifierPending => "identifier_pending",
            BatchState::IdentifierResolved => "identifier_resolved",
            BatchState::UsabilityPending => "usability_pending",
            BatchState::Usable => "usable",
            BatchState::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Usable | BatchState::TimedOut)
    }

    pub fn can_transition_to(&self, to: BatchState) -> bool {
        matches!(
            (self, to),
            (BatchState::Requested, BatchState::ReferenceObtained)
                | (BatchState::ReferenceObtained, BatchState::IdentifierPending)
                | (BatchState::IdentifierPending, BatchState::IdentifierResolved)
                | (BatchState::IdentifierPending, BatchState::TimedOut)
                | (BatchState::IdentifierResolved, BatchState::UsabilityPending)
                | (BatchState::UsabilityPending, BatchState::Usable)
                | (BatchState::UsabilityPending, BatchState::TimedOut)
        )
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch that has an identifier and accepts uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyBatch {
    pub reference: BatchReference,
    pub batch_id: BatchId,
}

/// `duration_secs * block_time_secs / price`
///
/// # Errors
///
/// A zero price is a validation error.
pub fn batch_amount(duration_secs: u64, block_time_secs: u64, price: u64) -> Result<u64> {
    if price == 0 {
        return Err(PublishError::Validation(
            "Chain price is zero, cannot compute batch amount".to_string(),
        ));
    }

    Ok(duration_secs.saturating_mul(block_time_secs) / price)
}

/// Drives one reservation from request to usable
///
/// A provisioner is created per publication run; its state only moves
/// forward.
pub struct BatchProvisioner {
    gateway: Arc<dyn PostageGateway>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    settings: BatchSettings,
    events: Option<EventBus>,
    state: BatchState,
}

impl BatchProvisioner {
    pub fn new(
        gateway: Arc<dyn PostageGateway>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            gateway,
            clock,
            timer,
            settings,
            events: None,
            state: BatchState::Requested,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Batch(event)).ok();
        }
    }

    fn ensure_transition(&self, to: BatchState) -> Result<()> {
        if self.state.can_transition_to(to) {
            Ok(())
        } else {
            Err(PublishError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self.state, to),
            })
        }
    }

    fn transition(&mut self, to: BatchState) -> Result<()> {
        self.ensure_transition(to)?;
        debug!(from = %self.state, to = %to, "Batch state transition");
        self.state = to;
        Ok(())
    }

    fn elapsed_since(&self, started: DateTime<Utc>) -> Duration {
        (self.clock.now() - started).to_std().unwrap_or_default()
    }

    /// Reserve a batch sized from the current chain price
    ///
    /// Not retried: a failed price query or reservation is fatal.
    #[instrument(skip(self), fields(depth = self.settings.depth))]
    pub async fn create(&mut self) -> Result<BatchReference> {
        self.ensure_transition(BatchState::ReferenceObtained)?;

        let price = self
            .gateway
            .chain_price()
            .await
            .map_err(|source| PublishError::BatchCreation {
                stage: "querying the chain price",
                source,
            })?;
        let amount = batch_amount(
            self.settings.duration.as_secs(),
            self.settings.block_time.as_secs(),
            price,
        )?;

        info!(price, amount, "Creating batch");
        self.emit(BatchEvent::Requested {
            depth: self.settings.depth,
            amount,
        });

        let reference = self
            .gateway
            .create_batch(self.settings.depth, amount)
            .await
            .map_err(|source| PublishError::BatchCreation {
                stage: "reserving the batch",
                source,
            })?;

        if reference.is_blank() {
            return Err(PublishError::Validation(
                "Gateway returned an empty batch reference".to_string(),
            ));
        }

        self.transition(BatchState::ReferenceObtained)?;
        self.emit(BatchEvent::ReferenceObtained {
            reference: reference.to_string(),
        });
        Ok(reference)
    }

    /// Poll until the chain has assigned an identifier to `reference`
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn resolve_identifier(&mut self, reference: &BatchReference) -> Result<BatchId> {
        self.transition(BatchState::IdentifierPending)?;
        let started = self.clock.now();

        loop {
            let waited = self.elapsed_since(started);
            if waited >= self.settings.timeout {
                self.transition(BatchState::TimedOut)?;
                self.emit(BatchEvent::TimedOut {
                    stage: "identifier".to_string(),
                    identifier: reference.to_string(),
                    waited_secs: waited.as_secs(),
                });
                return Err(PublishError::BatchIdentifierTimeout {
                    reference: reference.to_string(),
                    waited_secs: waited.as_secs(),
                });
            }

            self.timer.sleep(self.settings.poll_interval).await;

            match self.gateway.batch_id_for_reference(reference).await {
                Ok(Some(batch_id)) if !batch_id.is_blank() => {
                    self.transition(BatchState::IdentifierResolved)?;
                    info!(batch_id = %batch_id, "Batch identifier resolved");
                    self.emit(BatchEvent::IdentifierResolved {
                        reference: reference.to_string(),
                        batch_id: batch_id.to_string(),
                    });
                    return Ok(batch_id);
                }
                Ok(_) => debug!("Batch identifier not assigned yet"),
                Err(e) => warn!(error = %e, "Batch identifier poll failed"),
            }
        }
    }

    /// Poll until `batch_id` can stamp uploads
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn await_usable(&mut self, batch_id: &BatchId) -> Result<bool> {
        self.transition(BatchState::UsabilityPending)?;
        let started = self.clock.now();

        loop {
            let waited = self.elapsed_since(started);
            if waited >= self.settings.timeout {
                self.transition(BatchState::TimedOut)?;
                self.emit(BatchEvent::TimedOut {
                    stage: "usability".to_string(),
                    identifier: batch_id.to_string(),
                    waited_secs: waited.as_secs(),
                });
                return Err(PublishError::BatchUsabilityTimeout {
                    batch_id: batch_id.to_string(),
                    waited_secs: waited.as_secs(),
                });
            }

            self.timer.sleep(self.settings.poll_interval).await;

            match self.gateway.is_batch_usable(batch_id).await {
                Ok(true) => {
                    self.transition(BatchState::Usable)?;
                    info!("Batch usable");
                    self.emit(BatchEvent::Usable {
                        batch_id: batch_id.to_string(),
                    });
                    return Ok(true);
                }
                Ok(false) => debug!("Batch not usable yet"),
                Err(e) => warn!(error = %e, "Batch usability poll failed"),
            }
        }
    }

    /// Create a batch and wait until it is usable
    pub async fn provision(&mut self) -> Result<ReadyBatch> {
        let reference = self.create().await?;
        let batch_id = self.resolve_identifier(&reference).await?;
        self.await_usable(&batch_id).await?;

        Ok(ReadyBatch {
            reference,
            batch_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_amount_reference_values() {
        // one year at five second blocks
        let amount = batch_amount(31_536_000, 5, 24_000).unwrap();
        assert_eq!(amount, 6_570);
    }

    #[test]
    fn test_zero_price_is_rejected() {
        assert!(matches!(
            batch_amount(31_536_000, 5, 0),
            Err(PublishError::Validation(_))
        ));
    }

    #[test]
    fn test_transitions_only_move_forward() {
        use BatchState::*;

        assert!(Requested.can_transition_to(ReferenceObtained));
        assert!(IdentifierPending.can_transition_to(TimedOut));
        assert!(UsabilityPending.can_transition_to(TimedOut));

        assert!(!Requested.can_transition_to(Usable));
        assert!(!ReferenceObtained.can_transition_to(TimedOut));
        assert!(!IdentifierResolved.can_transition_to(Usable));
        assert!(!Usable.can_transition_to(Requested));
        assert!(!TimedOut.can_transition_to(IdentifierPending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(BatchState::Usable.is_terminal());
        assert!(BatchState::TimedOut.is_terminal());
        assert!(!BatchState::UsabilityPending.is_terminal());
    }
}
