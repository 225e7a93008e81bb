mod fs;
mod logging;

pub use fs::*;
pub use logging::*;
