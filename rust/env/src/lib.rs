extern crate rand;
extern crate serde;

pub mod common;
pub mod error;
pub mod facts;
pub mod graph;
pub mod sampler;

pub use common::*;
pub use error::*;
pub use facts::*;
pub use graph::*;
pub use sampler::*;

pub type Discrete = usize;
pub type Continous = f64;

/// Index of a state inside a [`Graph`].
pub type StateId = Discrete;

/// Default name of the absorbing state, i.e. the hole in the golf course.
pub const DEFAULT_ABSORBING_STATE: &str = "In";
