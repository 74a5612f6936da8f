use super::aggregator::{SampleAggregator, WindowStatus, WindowSummary};
use super::reader::Reader;
use super::source::LineSource;
use super::{CycleState, UpdateMessage};
use crate::classify::{ClassificationResult, Classifier, ImageSource, WasteType};
use crate::config::Config;
use crate::error::{CycleError, DeviceError};
use crate::notify::{DispatchOutcome, Dispatcher, Messenger, TelemetrySink};
use async_broadcast::Receiver;
use async_channel::bounded;
use futures_lite::future;
use smol::Task;
use smol_macros::Executor;
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Idle,
    Running,
    Done,
    Interrupted,
    /// Ended by a device or classifier failure.
    Failed,
}

#[derive(Debug, Clone)]
pub(crate) struct CycleSettings {
    pub window_size: usize,
    pub max_windows: Option<u32>,
    pub channel_capacity: usize,
    pub snapshot_path: Option<PathBuf>,
}

impl From<&Config> for CycleSettings {
    fn from(config: &Config) -> Self {
        Self {
            window_size: config.window.size,
            max_windows: config.window.max_windows,
            channel_capacity: config.device.channel_capacity,
            snapshot_path: config.camera.snapshot_path.clone(),
        }
    }
}

/// What a finished cycle hands back for bookkeeping.
#[derive(Debug)]
pub(crate) struct CycleReport {
    /// Averages of the window that produced the final classification.
    pub summary: WindowSummary,
    /// `None` when every window came back unresolved.
    pub waste_type: Option<WasteType>,
    pub dispatch: Option<DispatchOutcome>,
    pub windows: u32,
}

/// Owns the device for one detection cycle: sampling, classification and
/// dispatch, and the release of the device however the cycle ends.
pub(crate) struct LifecycleController<S, I, K, M, T> {
    source: Option<S>,
    camera: I,
    classifier: K,
    dispatcher: Dispatcher<M, T>,
    settings: CycleSettings,
    ctrl_c_receiver: Receiver<()>,
    stop_sender: Option<async_broadcast::Sender<()>>,
    reader: Option<Task<()>>,
    lifecycle: Lifecycle,
    cycle_state: CycleState,
}

impl<S, I, K, M, T> LifecycleController<S, I, K, M, T>
where
    S: LineSource + Send + 'static,
    I: ImageSource,
    K: Classifier,
    M: Messenger,
    T: TelemetrySink,
{
    pub(crate) fn new(
        source: S,
        camera: I,
        classifier: K,
        dispatcher: Dispatcher<M, T>,
        settings: CycleSettings,
        ctrl_c_receiver: Receiver<()>,
    ) -> Self {
        Self {
            source: Some(source),
            camera,
            classifier,
            dispatcher,
            settings,
            ctrl_c_receiver,
            stop_sender: None,
            reader: None,
            lifecycle: Lifecycle::Idle,
            cycle_state: CycleState::Sampling,
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn cycle_state(&self) -> CycleState {
        self.cycle_state
    }

    /// Run one cycle to completion. The device is released before this
    /// returns, on every path.
    pub(crate) async fn run(&mut self, ex: &Executor<'_>) -> Result<CycleReport, CycleError> {
        let Some(source) = self.source.take() else {
            return Err(DeviceError::Closed.into());
        };

        let (sender, receiver) = bounded(self.settings.channel_capacity);
        let (stop_sender, stop_receiver) = async_broadcast::broadcast(1);
        self.reader = Some(Reader::spawn(ex, source, sender, stop_receiver));
        self.stop_sender = Some(stop_sender);
        self.lifecycle = Lifecycle::Running;
        info!("Cycle started");

        let result = self.drive(&receiver).await;
        drop(receiver);
        self.shutdown().await;

        match &result {
            Ok(report) => {
                self.enter(CycleState::Done);
                self.lifecycle = Lifecycle::Done;
                info!(
                    "Avg Load: {:.2} g, Avg Trash: {:.2}%, Predicted Waste Type: {}",
                    report.summary.avg_load,
                    report.summary.avg_trash,
                    report
                        .waste_type
                        .map_or_else(|| "None".to_string(), |w| w.to_string())
                );
            }
            Err(CycleError::Interrupted) => {
                self.enter(CycleState::Interrupted);
                self.lifecycle = Lifecycle::Interrupted;
                info!("Safely shutting down...");
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Failed;
                warn!("Cycle failed: {e}");
            }
        }
        result
    }

    /// Stop the reader and release the device. Safe to call repeatedly.
    pub(crate) async fn shutdown(&mut self) {
        if let Some(stop_sender) = self.stop_sender.take() {
            let _ = stop_sender.try_broadcast(());
        }
        if let Some(reader) = self.reader.take() {
            reader.await;
            info!("Device released");
        }
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }

    async fn drive(
        &mut self,
        receiver: &async_channel::Receiver<UpdateMessage>,
    ) -> Result<CycleReport, CycleError> {
        let mut aggregator = SampleAggregator::new(self.settings.window_size);
        let mut windows = 0u32;
        self.enter(CycleState::Sampling);

        loop {
            let message = interruptible(&mut self.ctrl_c_receiver, receiver.recv())
                .await?
                .map_err(|_| DeviceError::Closed)?;

            let (timestamp, reading) = match message {
                UpdateMessage::Reading { timestamp, reading } => (timestamp, reading),
                UpdateMessage::DeviceFailed { error } => return Err(error.into()),
            };

            let WindowStatus::Full(summary) = aggregator.observe(reading) else {
                continue;
            };
            windows += 1;
            info!(
                "[{timestamp:?}] Window {} full after {} lines: avg load {:.2} g, avg trash {:.2}%",
                windows,
                aggregator.count(),
                summary.avg_load,
                summary.avg_trash
            );

            self.enter(CycleState::Classifying);
            let result = self.classify().await?;

            if !result.waste_type.is_resolved() {
                if self.settings.max_windows == Some(windows) {
                    info!("Nothing detected after {windows} windows, giving up");
                    return Ok(CycleReport {
                        summary,
                        waste_type: None,
                        dispatch: None,
                        windows,
                    });
                }
                info!("Nothing detected, sampling a new window");
                aggregator = SampleAggregator::new(self.settings.window_size);
                self.enter(CycleState::Sampling);
                continue;
            }

            self.enter(CycleState::Dispatching);
            let dispatch =
                interruptible(&mut self.ctrl_c_receiver, self.dispatcher.dispatch(&result)).await?;

            return Ok(CycleReport {
                summary,
                waste_type: Some(result.waste_type),
                dispatch: Some(dispatch),
                windows,
            });
        }
    }

    async fn classify(&mut self) -> Result<ClassificationResult, CycleError> {
        let image = interruptible(&mut self.ctrl_c_receiver, self.camera.capture()).await??;
        let result =
            interruptible(&mut self.ctrl_c_receiver, self.classifier.classify(image)).await??;
        info!("Classifier: {}", result.waste_type);

        if let Some(path) = &self.settings.snapshot_path {
            if let Err(e) = async_fs::write(path, &result.image).await {
                warn!("Could not save frame to {}: {e}", path.display());
            }
        }
        Ok(result)
    }

    fn enter(&mut self, state: CycleState) {
        if self.cycle_state != state {
            info!("Cycle: {:?} -> {:?}", self.cycle_state, state);
            self.cycle_state = state;
        }
    }
}

/// Race `fut` against a termination request. The request is polled first,
/// so a ready `fut` never hides it. The losing future is dropped, which
/// abandons whatever it had in flight.
async fn interruptible<F: Future>(
    ctrl_c_receiver: &mut Receiver<()>,
    fut: F,
) -> Result<F::Output, CycleError> {
    future::or(
        async {
            if ctrl_c_receiver.recv().await.is_err() {
                // No handler left to signal us.
                future::pending::<()>().await;
            }
            Err(CycleError::Interrupted)
        },
        async { Ok(fut.await) },
    )
    .await
}
