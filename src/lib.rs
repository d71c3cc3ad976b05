//! Pipelined N-ary tree reduce over one-sided writes.
//!
//! Every rank holds an input vector; [`reduce`] combines them element-wise
//! into the root. Vectors are cut into blocks that travel leaves-to-root
//! through a fan-in tree: leaves write each block straight into their
//! parent's memory, and interior ranks fold a block in as soon as all of
//! their children have delivered it, then forward the result. Arrivals are
//! signalled by remote notification counters, never by inspecting payloads.

pub mod collective;
pub mod config;
pub mod error;
pub mod reduce;
pub mod substrate;
pub mod types;

pub use collective::{ReducePlan, reduce, tree_reduce};
pub use config::{FabricConfig, ReduceConfig};
pub use error::{NwayError, Result};
pub use reduce::{Element, FnOperator, Operator};
pub use substrate::{LocalFabric, Substrate};
pub use types::{NotifyId, QueueId, Rank, ReduceOp, RegionId, WriteRequest};
