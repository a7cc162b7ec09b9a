pub mod engine;
pub mod message;
pub mod stats;
pub mod topic;

pub use engine::Bridge;
pub use message::{SimpleMessage, SimpleSubscription, Status};
pub use stats::Stats;
pub use topic::SubscriptionRegistry;
