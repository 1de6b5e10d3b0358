pub mod location;
pub mod pricing;
pub mod registry;

pub use location::LocationConfig;
pub use pricing::PricingError;
pub use registry::{LocationRegistry, RegistryError, Venue};
