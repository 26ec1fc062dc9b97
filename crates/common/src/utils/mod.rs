pub mod logging;
pub mod bytes;
