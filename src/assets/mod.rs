//! In-process stand-ins for the contracts and transport the vault talks to

pub mod chain;
pub mod registry;
pub mod token;

pub use chain::*;
pub use registry::*;
pub use token::*;
