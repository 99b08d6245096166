pub mod channels;
pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod plot;
pub mod signal;

pub use channels::*;
pub use config::*;
pub use detectors::*;
pub use error::*;
pub use signal::*;
