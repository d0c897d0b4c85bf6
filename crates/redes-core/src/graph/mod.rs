//! Entity networks and the builders that produce them.

pub mod bipartite;
pub mod network;
pub mod similarity;
