pub mod clock;
pub mod detector;
pub mod event_tracker;
pub mod poller;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use event_tracker::TrackerDeps;
pub use poller::AdaptivePoller;
pub use supervisor::{Supervisor, TeamFilter};
