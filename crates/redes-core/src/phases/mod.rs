//! Pipeline phases. Each takes the run configuration and the pipeline's
//! state, and fills in the part of the state it owns.

pub mod benefits;
pub mod grants;
