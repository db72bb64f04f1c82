pub mod nhl;
pub mod provider;

pub use nhl::NhlApi;
pub use provider::{ScheduleSource, StatusSource};
