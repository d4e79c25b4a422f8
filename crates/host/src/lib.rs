#![forbid(unsafe_code)]

pub mod driver;
pub mod local;
pub mod render;
pub mod tcp;

pub use driver::{MAX_LINE_LEN, SessionEnd, drive};
pub use local::run_local;
pub use tcp::TcpHost;
