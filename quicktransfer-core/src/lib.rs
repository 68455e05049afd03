pub mod buttons;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod interaction;
pub mod outcome;
pub mod types;

// Keep the public surface small and intentional.
pub use buttons::*;
pub use capabilities::*;
pub use config::*;
pub use error::*;
pub use interaction::*;
pub use outcome::*;
pub use types::*;
