pub mod memory;

pub use memory::{InMemoryOperationRepository, InMemoryTenantRepository};
