//! Reading, cleaning and aggregating the raw CSV exports.

pub mod aggregate;
pub mod loader;
pub mod normalize;
pub mod records;
pub mod source;
