pub mod crs;
pub mod units;

pub use crs::Crs;
pub use units::LinearUnit;
