//! Entity stores
//!
//! Each entity is a tag-keyed bag of components owned by its own worker
//! task. Callers talk to it through an [`Entity`] handle.

pub mod component;
pub mod entity;
pub mod tag;
mod worker;

pub use component::{BoxedComponent, Component, Payload, Record, Structural, Transform};
pub use entity::{Entity, EntityBuilder, EntityId};
pub use tag::Tag;
