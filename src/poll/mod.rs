//! Client-side polling of cached resources

pub mod policy;
pub mod scheduler;
pub mod visibility;

pub use policy::{secs, BuildsInterval};
pub use scheduler::{PollOptions, PollScheduler, PollState, Subscription};
pub use visibility::{should_run, Visibility};
