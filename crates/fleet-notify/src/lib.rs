pub mod bus;
pub mod error;
pub mod mapper;
pub mod types;

pub use bus::*;
pub use error::*;
pub use mapper::*;
pub use types::*;
