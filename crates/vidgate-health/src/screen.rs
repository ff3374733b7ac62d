//! Two-phase screen inspection for a slot.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use vidgate_core::config::GatewayConfig;
use vidgate_core::HealthReport;

use crate::classifier::{Assessment, FrameClassifier};
use crate::frame::Frame;
use crate::models::ScreenVerdict;
use crate::source::FrameSource;
use crate::Result;

/// Default wait between the two samples of a mostly black screen.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Entity name used in screen health reports.
pub const SCREEN_ENTITY: &str = "SCREEN";

/// Classifies the screen of a slot, re-sampling dark frames.
#[derive(Clone)]
pub struct ScreenInspector {
    frames: Arc<dyn FrameSource>,
    classifier: FrameClassifier,
    settle_delay: Duration,
}

impl std::fmt::Debug for ScreenInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenInspector")
            .field("classifier", &self.classifier)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl ScreenInspector {
    /// Create an inspector reading frames from `frames`.
    #[must_use]
    pub fn new(frames: Arc<dyn FrameSource>) -> Self {
        Self {
            frames,
            classifier: FrameClassifier::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Create an inspector using the configured settle delay.
    #[must_use]
    pub fn from_config(config: &GatewayConfig, frames: Arc<dyn FrameSource>) -> Self {
        Self::new(frames).with_settle_delay(config.settle_delay())
    }

    /// Override the wait before the second sample.
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// The wait before the second sample.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Classify the screen of `slot`.
    ///
    /// A mostly black frame is sampled again after the settle delay; the
    /// screen is `Black` only if nothing in the central window moved.
    ///
    /// # Errors
    ///
    /// Returns the frame source error, or [`vidgate_core::Error::DecodeFailure`]
    /// if a frame cannot be decoded.
    pub async fn inspect(&self, slot: &str) -> Result<ScreenVerdict> {
        let first = self.sample(slot).await?;

        match self.classifier.assess(&first) {
            Assessment::Verdict(verdict) => {
                info!(slot, %verdict, "Screen classified");
                Ok(verdict)
            }
            Assessment::NeedsFrozenCheck => {
                debug!(slot, delay = ?self.settle_delay, "Dark screen, sampling again");
                tokio::time::sleep(self.settle_delay).await;
                let second = self.sample(slot).await?;
                let verdict = self.classifier.compare_frames(&first, &second);
                info!(slot, %verdict, "Screen classified after second sample");
                Ok(verdict)
            }
        }
    }

    /// Human-readable screen status for `slot`.
    ///
    /// # Errors
    ///
    /// See [`ScreenInspector::inspect`].
    pub async fn screen_status(&self, slot: &str) -> Result<String> {
        let verdict = self.inspect(slot).await?;
        Ok(format!("Observed the screen to be {verdict}"))
    }

    /// Screen health of `slot`; healthy only for a `Normal` screen.
    ///
    /// Never fails: fetch and decode errors become the report remark.
    pub async fn screen_health(&self, slot: &str) -> HealthReport {
        match self.inspect(slot).await {
            Ok(ScreenVerdict::Normal) => HealthReport::healthy(slot, SCREEN_ENTITY),
            Ok(verdict) => HealthReport::unhealthy(
                slot,
                SCREEN_ENTITY,
                format!("Observed the screen to be {verdict}"),
            ),
            Err(err) => {
                warn!(slot, error = %err, "Screen inspection failed");
                HealthReport::unhealthy(slot, SCREEN_ENTITY, err.message())
            }
        }
    }

    async fn sample(&self, slot: &str) -> Result<Frame> {
        let bytes = self.frames.fetch_frame(slot).await?;
        Frame::decode(&bytes)
    }
}
