use crate::config::{TrackerConfig, FOOT_TICK_DELAY_MS};
use crate::error::{TResult, TrackerError};
use crate::live_status::LiveStatus;
use crate::notifier::{spawn_foot_ticker, TrackListener};
use crate::pipeline::{PipelineController, PipelineState};
use crate::storage::{save_debug_streams, save_session, ArtifactSink, SessionExport};
use crate::trajectory::StepUpdate;
use crate::types::{PathPoint, SensorSample};
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Thread-safe handle around one [`PipelineController`].
///
/// Sensor threads push samples, the UI side reads positions, and the foot
/// ticker runs on the tokio runtime given with [`TrackerSession::with_runtime`].
pub struct TrackerSession {
    pipeline: Arc<Mutex<PipelineController>>,
    listener: Option<Arc<dyn TrackListener>>,
    runtime: Option<Handle>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl TrackerSession {
    /// Create new session in Idle state
    pub fn new(config: TrackerConfig) -> TResult<Self> {
        let controller = PipelineController::new(config)?;
        Ok(TrackerSession {
            pipeline: Arc::new(Mutex::new(controller)),
            listener: None,
            runtime: None,
            ticker: Mutex::new(None),
        })
    }

    /// Attach a listener for step and foot-marker notifications.
    ///
    /// The listener is called with the pipeline lock released, so it may read
    /// back from the session.
    pub fn with_listener(mut self, listener: Arc<dyn TrackListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Runtime used for the periodic foot ticker
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    fn lock(&self) -> TResult<MutexGuard<'_, PipelineController>> {
        self.pipeline.lock().map_err(|_| {
            TrackerError::Internal("Failed to acquire pipeline lock".to_string())
        })
    }

    fn lock_ticker(&self) -> TResult<MutexGuard<'_, Option<JoinHandle<()>>>> {
        self.ticker.lock().map_err(|_| {
            TrackerError::Internal("Failed to acquire ticker lock".to_string())
        })
    }

    /// Transition Idle → Active, clearing the previous session
    pub fn start(&self) -> TResult<()> {
        let period = {
            let mut pipeline = self.lock()?;
            if pipeline.is_active() {
                return Err(TrackerError::AlreadyRunning);
            }
            pipeline.start();
            pipeline.config().foot_tick_ms
        };

        if let (Some(runtime), Some(listener)) = (&self.runtime, &self.listener) {
            let task = spawn_foot_ticker(
                runtime,
                self.pipeline.clone(),
                listener.clone(),
                Duration::from_millis(FOOT_TICK_DELAY_MS),
                Duration::from_millis(period),
            );
            if let Some(previous) = self.lock_ticker()?.replace(task) {
                previous.abort();
            }
            debug!("foot ticker scheduled every {} ms", period);
        }
        Ok(())
    }

    /// Transition Active → Idle and cancel the foot ticker
    pub fn stop(&self) -> TResult<()> {
        {
            let mut pipeline = self.lock()?;
            if !pipeline.is_active() {
                return Err(TrackerError::NotRunning);
            }
            pipeline.stop();
        }
        if let Some(task) = self.lock_ticker()?.take() {
            task.abort();
        }
        Ok(())
    }

    pub fn state(&self) -> TResult<PipelineState> {
        Ok(self.lock()?.state())
    }

    pub fn is_active(&self) -> TResult<bool> {
        Ok(self.lock()?.is_active())
    }

    /// Feed one sample; ignored unless the session is active
    pub fn push_sample(&self, sample: SensorSample) -> TResult<Option<StepUpdate>> {
        let update = self.lock()?.on_sample(sample)?;
        if let (Some(update), Some(listener)) = (&update, &self.listener) {
            listener.on_step_update(update.position.x, update.position.y, update.step_count);
        }
        Ok(update)
    }

    pub fn current_position(&self) -> TResult<PathPoint> {
        Ok(self.lock()?.current_position())
    }

    pub fn step_count(&self) -> TResult<usize> {
        Ok(self.lock()?.step_count())
    }

    pub fn export(&self) -> TResult<SessionExport> {
        self.lock()?.export()
    }

    pub fn status(&self) -> TResult<LiveStatus> {
        let pipeline = self.lock()?;
        Ok(LiveStatus::from_pipeline(&pipeline))
    }

    /// Save the stopped session's selected artifacts, then the debug streams
    /// if enabled in the config.
    pub fn save<S: ArtifactSink>(&self, sink: &mut S, wifi: Option<&str>) -> TResult<usize> {
        let (export, selection) = {
            let pipeline = self.lock()?;
            (pipeline.export()?, pipeline.config().save)
        };
        let mut written = save_session(&export, wifi, sink, &selection)?;
        if selection.debug_streams {
            written += save_debug_streams(&export, sink)?;
        }
        info!("session saved ({} artifacts)", written);
        Ok(written)
    }
}

impl Drop for TrackerSession {
    fn drop(&mut self) {
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(task) = ticker.take() {
                task.abort();
            }
        }
    }
}
