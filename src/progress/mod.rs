pub mod emitter;
pub mod events;
pub mod observer;

pub use emitter::{ProgressEmitter, UserFacingError};
pub use events::{Phase, ProgressEvent};
pub use observer::{BatchProgress, NoopObserver, PipelineObserver};
