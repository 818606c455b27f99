pub mod bootstrap;
pub mod identity;
pub mod metrics;
pub mod register;

pub use bootstrap::{BootstrapFlow, BootstrapOutcome, BootstrapState};
pub use identity::{HardwareKeyManager, IdentityManager};
