//! Class composition engine
//!
//! - [`metadata`]: per-class side table (binds, accessors, superclass)
//! - [`super_dispatch`]: super-call analysis and the per-call sentinel wrapper
//! - `extension`: installs processed members onto classes and objects
//! - `factory`: class creation and the public definition entry points

mod extension;
mod factory;
pub mod metadata;
pub mod super_dispatch;

pub(crate) use factory::Construction;
pub use metadata::{AccessorPair, MetadataStore};
pub use super_dispatch::{requires_super, SuperDispatch};
