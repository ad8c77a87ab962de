pub mod clock;
pub mod spring;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use spring::{Spring, SpringState};
