//! Camera ownership and the fixed-period sampling loop

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use super::{EngagementMetrics, EngagementSampler};
use crate::capabilities::{
    DeviceKind, FrameClassifier, MediaDevices, MediaError, MediaHandle, PermissionState, RawFrame,
};

/// Owns the camera handle and samples it while active
pub struct EngagementMonitor {
    devices: Arc<dyn MediaDevices>,
    classifier: Box<dyn FrameClassifier>,
    sampler: EngagementSampler,
    period: Duration,
    camera: Option<MediaHandle>,
    ticker: Option<Interval>,
}

impl EngagementMonitor {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        classifier: Box<dyn FrameClassifier>,
        sampler: EngagementSampler,
        period: Duration,
    ) -> Self {
        Self {
            devices,
            classifier,
            sampler,
            period,
            camera: None,
            ticker: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.camera.as_ref().is_some_and(MediaHandle::is_live)
    }

    /// Acquire the camera; a no-op when already active
    pub fn start(&mut self) -> Result<(), MediaError> {
        if self.is_active() {
            return Ok(());
        }
        if self.devices.permission(DeviceKind::Camera) == Some(PermissionState::Denied) {
            return Err(MediaError::PermissionDenied(DeviceKind::Camera));
        }

        let camera = self.devices.open(DeviceKind::Camera)?;
        self.sampler.reset();
        self.camera = Some(camera);
        info!(period_ms = self.period.as_millis() as u64, "engagement sampling started");
        Ok(())
    }

    /// Release the camera and stop ticking; safe when inactive
    pub fn stop(&mut self) {
        self.ticker = None;
        if let Some(mut camera) = self.camera.take() {
            camera.release();
            self.sampler.reset();
            info!("engagement sampling stopped");
        }
    }

    /// Classify one frame now, if the camera is live
    pub fn sample_now(&mut self) -> Option<EngagementMetrics> {
        let camera = self.camera.as_ref().filter(|c| c.is_live())?;
        let frame = match self.classifier.classify(camera) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(?e, "frame classification failed, treating as no face");
                RawFrame::default()
            }
        };
        Some(self.sampler.observe(frame))
    }

    /// Wait for the next sampling tick; pending forever while inactive
    pub async fn next_sample(&mut self) -> EngagementMetrics {
        loop {
            if !self.is_active() {
                self.ticker = None;
                return std::future::pending().await;
            }
            let period = self.period;
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker
            });
            ticker.tick().await;
            if let Some(metrics) = self.sample_now() {
                return metrics;
            }
        }
    }
}

impl Drop for EngagementMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
