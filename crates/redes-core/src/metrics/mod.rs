//! Node, graph and value statistics.

pub mod centrality;
pub mod communities;
pub mod stats;
pub mod structure;
