pub mod buffer2;
pub mod file_format;
pub mod log_setup;
pub mod parallel;
pub mod stop_flag;

pub use buffer2::Buffer2;
pub use parallel::{BatchReport, TaskFailure, TaskResult, WorkerPool};
pub use stop_flag::StopFlag;

pub const EPSILON: f64 = 1e-6;
