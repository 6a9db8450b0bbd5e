pub mod integration;
pub mod registry;

pub use integration::{IntegrationClient, IntegrationRequest, IntegrationResponse};
pub use registry::{ClientProvider, IntegrationRegistry};
