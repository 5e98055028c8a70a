pub mod forecast;
pub mod region;
pub mod types;

pub use forecast::*;
pub use region::*;
pub use types::*;
