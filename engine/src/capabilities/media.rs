//! Live media handles
//!
//! A handle is owned by exactly one controller. Dropping or releasing it
//! stops the underlying track before the call returns.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Input device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Microphone,
    Camera,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Microphone => write!(f, "microphone"),
            DeviceKind::Camera => write!(f, "camera"),
        }
    }
}

/// Host permission state for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

impl std::str::FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(Self::Granted),
            "prompt" => Ok(Self::Prompt),
            "denied" => Ok(Self::Denied),
            other => Err(format!("unknown permission state '{other}'")),
        }
    }
}

/// A hardware track that can be stopped
pub trait MediaTrack: Send {
    fn stop(&mut self);
}

/// Exclusive handle on a live media stream
pub struct MediaHandle {
    kind: DeviceKind,
    track: Option<Box<dyn MediaTrack>>,
}

impl MediaHandle {
    pub fn new(kind: DeviceKind, track: Box<dyn MediaTrack>) -> Self {
        Self {
            kind,
            track: Some(track),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.track.is_some()
    }

    /// Stop the track; later calls are no-ops
    pub fn release(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
            debug!(kind = %self.kind, "media track released");
        }
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("kind", &self.kind)
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTrack(Arc<AtomicUsize>);

    impl MediaTrack for CountingTrack {
        fn stop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_stops_track_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut handle = MediaHandle::new(
            DeviceKind::Camera,
            Box::new(CountingTrack(Arc::clone(&stops))),
        );
        assert!(handle.is_live());

        handle.release();
        handle.release();
        assert!(!handle.is_live());
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        drop(handle);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_live_track() {
        let stops = Arc::new(AtomicUsize::new(0));
        let handle = MediaHandle::new(
            DeviceKind::Microphone,
            Box::new(CountingTrack(Arc::clone(&stops))),
        );
        drop(handle);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("Denied".parse::<PermissionState>(), Ok(PermissionState::Denied));
        assert_eq!(" granted ".parse::<PermissionState>(), Ok(PermissionState::Granted));
        assert!("maybe".parse::<PermissionState>().is_err());
    }
}
