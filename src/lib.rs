//! Class schedule search and live "happening now" tracking.
//!
//! [`services::search::SearchChannel`] answers fuzzy queries from a worker
//! off the async executor; [`services::live::LiveStatusView`] classifies the
//! timetable on a timer and renders only what changed.

pub mod core;
pub mod models;
pub mod services;
