pub mod config;
pub mod constants;
pub mod env;
pub mod error;
pub mod types;

pub use config::BridgeConfig;
pub use env::{
    Clock, ManualClock, RandomSource, ScriptedRandom, SeededRandom, SystemClock, ThreadRandom,
};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
