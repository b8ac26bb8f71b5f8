//! Fleet simulator daemon crate.

pub mod catalog;
pub mod dependency_graph;
pub mod engine;
pub mod filter;
pub mod generator;
pub mod injector;
pub mod recovery;
pub mod sampler;
pub mod scheduler;
pub mod simulator;
pub mod store;
pub mod swap;

pub use catalog::*;
pub use dependency_graph::*;
pub use engine::*;
pub use filter::*;
pub use injector::*;
pub use recovery::*;
pub use scheduler::*;
pub use simulator::*;
pub use store::*;
