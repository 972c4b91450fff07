pub mod processor;
pub mod store;
pub mod time_utils;

pub use processor::{ActiveClasses, ScheduleProcessor};
pub use store::ScheduleStore;
