pub mod constraint_compiler;
pub mod constraint_store;
pub mod resource_registry;

pub use constraint_compiler::{CompileOutcome, ConstraintCompiler};
pub use constraint_store::{ConstraintStore, Scope};
pub use resource_registry::{ResourceBehavior, ResourceRegistry, ResourceRegistryBuilder};
