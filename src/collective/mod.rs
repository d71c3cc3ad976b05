mod engine;
mod partition;
mod plan;
mod reduce;
mod tag;
mod topology;
mod tracker;

pub use partition::{BlockLayout, restrict_fan_in};
pub use plan::ReducePlan;
pub use reduce::{DriverState, reduce, tree_reduce};
pub use tag::{NotificationTag, TagSpace};
pub use topology::{ReductionTree, to_position, to_rank};
pub use tracker::ArrivalState;
