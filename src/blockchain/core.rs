// core.rs splits responsibilities into submodules: block sealing, chain
// management, sequence validation, derived state and the shared handle.
pub mod block;
pub mod chain;
pub mod shared;
pub mod state;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use shared::*;
pub use state::*;
pub use validation::*;
