mod check;
mod config;
mod constants;
mod error;
mod outcome;
mod snapshot;

pub use check::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use outcome::*;
pub use snapshot::*;
