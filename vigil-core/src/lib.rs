mod config;
mod constants;
mod credential;
mod stage;
mod stats;

pub use config::*;
pub use constants::*;
pub use credential::*;
pub use stage::*;
pub use stats::*;
