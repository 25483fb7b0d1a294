//! Concrete operator implementations. Each submodule groups one family of
//! operators the way [`crate::graph::StreamHandle`]'s fluent methods expose
//! them.

pub mod concat;
pub mod consolidate;
pub mod debug;
pub mod iterate;
pub mod join;
pub mod linear;
pub mod reduce;

pub use concat::Concat;
pub use consolidate::Consolidate;
pub use debug::Debug;
pub use iterate::{Egress, Feedback, Ingress};
pub use join::Join;
pub use linear::{Filter, Map, Negate};
pub use reduce::Reduce;
