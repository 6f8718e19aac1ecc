//! One install at a time
//!
//! The service hands out [`RunningInstall`]s and refuses new ones while a
//! run is in flight. The pipeline runs on the tokio runtime; the caller
//! drains `events` on its own side and may cancel through `cancel`.

use super::{InstallResult, Installer};
use crate::error::InstallError;
use crate::progress::{CancelHandle, ProgressEvent, ProgressSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::debug;

/// A started install run
pub struct RunningInstall {
    /// Progress events; the last one is `Done` or `Failed`
    pub events: UnboundedReceiver<ProgressEvent>,
    pub cancel: CancelHandle,
    pub handle: JoinHandle<InstallResult>,
}

/// Gatekeeper for install runs
#[derive(Debug, Clone, Default)]
pub struct InstallService {
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the run ends, including on panic
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl InstallService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `installer` on the current tokio runtime.
    ///
    /// Fails with [`InstallError::AlreadyRunning`] while another run started
    /// by this service has not finished.
    pub fn start(&self, installer: Installer) -> Result<RunningInstall, InstallError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Rejected install request: a run is already in flight");
            return Err(InstallError::AlreadyRunning);
        }

        let guard = BusyGuard(self.busy.clone());
        let (progress, events) = ProgressSender::channel();
        let (cancel, token) = CancelHandle::new();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            installer.run(progress, token).await
        });

        Ok(RunningInstall {
            events,
            cancel,
            handle,
        })
    }
}
