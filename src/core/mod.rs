pub mod calendar;
pub mod expense;
pub mod stats;
pub mod suggestion;
pub mod task;
pub mod validate;
