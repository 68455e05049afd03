pub mod fixture;
pub mod memory;

pub use fixture::{FixtureTask, HostFixture};
pub use memory::{HostSurface, InitBehavior, MemoryHost, TransferBehavior, TransferCall};
