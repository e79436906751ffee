#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod allocator;
mod backend;
mod catalog;
mod config;
mod error;
mod forest;
mod graph;
mod guid;
mod node;
mod pool;
mod registry;
mod slot;
pub mod tracer;

pub use allocator::*;
pub use backend::*;
pub use catalog::*;
pub use config::*;
pub use error::*;
pub use forest::*;
pub use graph::*;
pub use guid::*;
pub use node::*;
pub use pool::*;
pub use registry::*;
pub use slot::*;
pub use tracer::{LogTracer, NoopTracer, Tracer};
