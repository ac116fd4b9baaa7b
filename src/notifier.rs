use crate::pipeline::PipelineController;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};

/// Receives position updates for a rendering collaborator.
///
/// Coordinates are meters in the trajectory frame; any scaling to screen
/// units happens on the receiving side. `TrackerSession` and the foot ticker
/// call these with the pipeline lock released.
pub trait TrackListener: Send + Sync {
    /// Periodic foot marker with the latest position
    fn on_foot_update(&self, x: f64, y: f64);

    /// Fired exactly once per accepted step
    fn on_step_update(&self, x: f64, y: f64, step_count: usize);
}

/// Listener that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl TrackListener for LogListener {
    fn on_foot_update(&self, x: f64, y: f64) {
        log::trace!("foot at ({:.2}, {:.2})", x, y);
    }

    fn on_step_update(&self, x: f64, y: f64, step_count: usize) {
        log::info!("step {} -> ({:.2}, {:.2})", step_count, x, y);
    }
}

/// Spawn the foot marker task: first tick after `delay`, then every `period`.
///
/// Each tick copies the latest position under the pipeline lock and notifies
/// after releasing it. The task exits at the first tick that finds the
/// pipeline idle.
pub fn spawn_foot_ticker(
    handle: &Handle,
    pipeline: Arc<Mutex<PipelineController>>,
    listener: Arc<dyn TrackListener>,
    delay: Duration,
    period: Duration,
) -> JoinHandle<()> {
    handle.spawn(async move {
        sleep(delay).await;
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            let position = match pipeline.lock() {
                Ok(guard) if guard.is_active() => guard.current_position(),
                Ok(_) => break,
                Err(_) => {
                    log::error!("pipeline lock poisoned, stopping foot ticker");
                    break;
                }
            };
            listener.on_foot_update(position.x, position.y);
        }
    })
}
