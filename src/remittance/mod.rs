//! Remittance lifecycle and dispatch

pub mod banks;
pub mod codes;
pub mod dispatcher;
pub mod locks;
pub mod retry;
pub mod state;

pub use banks::*;
pub use codes::*;
pub use dispatcher::*;
pub use locks::*;
pub use retry::*;
pub use state::*;
