pub mod filters;
pub mod live;
pub mod schedule;
pub mod search;
