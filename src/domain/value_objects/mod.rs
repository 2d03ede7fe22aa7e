pub mod cluster_id;
pub mod constraint;
pub mod resource_ref;
pub mod unit;

pub use cluster_id::ClusterId;
pub use constraint::{Bound, Constraint};
pub use resource_ref::ResourceRef;
pub use unit::Unit;
