pub mod device;
pub mod fault;
pub mod node;

pub use device::{Device, Role};
pub use fault::{Fault, NewFault, CONFIDENCE_RANGE};
pub use node::{Location, Node, NodeId, NodeStatus};
