//! Streaming step detection and pedestrian dead reckoning.
//!
//! Accelerometer magnitudes are smoothed and scanned for footfalls; each
//! accepted step is projected one step length along the magnetometer heading
//! to build a 2-D walking path.

pub mod config;
pub mod error;
pub mod heading;
pub mod live_status;
pub mod notifier;
pub mod orientation;
pub mod pipeline;
pub mod sensors;
pub mod session;
pub mod smoothing;
pub mod step_detector;
pub mod storage;
pub mod trajectory;
pub mod types;

pub use config::{SaveSelection, TrackerConfig};
pub use error::{TResult, TrackerError};
pub use heading::HeadingResolver;
pub use live_status::LiveStatus;
pub use notifier::{LogListener, TrackListener};
pub use orientation::OrientationEstimator;
pub use pipeline::{PipelineController, PipelineState};
pub use sensors::{RecordedSession, SampleQueue};
pub use session::TrackerSession;
pub use smoothing::SignalFilter;
pub use step_detector::StepDetector;
pub use storage::{Artifact, ArtifactSink, DirectorySink, SessionExport, SessionSummary};
pub use trajectory::{StepUpdate, TrajectoryBuilder};
pub use types::{
    HeadingSample, PathPoint, SensorKind, SensorSample, StepEvent, TimedScalar, TimedVector3,
};
