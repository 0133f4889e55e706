pub mod format;
pub mod logging;

pub use format::format_clock;
pub use logging::init_logging;
