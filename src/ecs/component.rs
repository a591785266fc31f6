//! Component contract and its structural default.
//!
//! Every value stored in an entity implements [`Component`]. Most component
//! types only need to implement [`Structural`], which exposes a tag and a
//! payload and receives the full contract through a blanket implementation.

use std::any::Any;

use serde_json::Value as Json;

use super::Tag;
use crate::error::{EcsError, Result};

/// Type-erased component payload.
pub type Payload = Box<dyn Any + Send>;

/// Type-erased payload transform handed to [`Component::update`].
pub type Transform = Box<dyn FnOnce(&dyn Any) -> Result<Payload> + Send>;

pub type BoxedComponent = Box<dyn Component>;

/// Capability set every component value must satisfy.
pub trait Component: Send + 'static {
    /// Tag the component is stored under. Never changes for a given value.
    fn type_of(&self) -> Result<Tag>;

    /// Current payload.
    fn value_of(&self) -> Result<&dyn Any>;

    /// Builds a replacement component with the same tag whose payload is
    /// `transform(value_of(self))`. `self` is left untouched; if `transform`
    /// fails, its error is returned and no replacement exists.
    fn update(&self, transform: Transform) -> Result<BoxedComponent>;
}

/// Tagged-record shape: a tag plus a payload of one concrete type.
pub trait Structural: Send + 'static {
    type Value: Any + Send;

    fn tag(&self) -> Tag;

    fn value(&self) -> &Self::Value;

    /// Same component, carrying `value` instead.
    fn with_value(&self, value: Self::Value) -> Self
    where
        Self: Sized;
}

impl<T: Structural> Component for T {
    fn type_of(&self) -> Result<Tag> {
        Ok(self.tag())
    }

    fn value_of(&self) -> Result<&dyn Any> {
        Ok(self.value() as &dyn Any)
    }

    fn update(&self, transform: Transform) -> Result<BoxedComponent> {
        let next = transform(self.value() as &dyn Any)?
            .downcast::<T::Value>()
            .map_err(|_| EcsError::payload_type::<T::Value>(&self.tag()))?;
        Ok(Box::new(self.with_value(*next)))
    }
}

/// Generic `{ tag, value }` component.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<V> {
    pub tag: Tag,
    pub value: V,
}

impl<V> Record<V> {
    pub fn new(tag: impl Into<Tag>, value: V) -> Self {
        Self {
            tag: tag.into(),
            value,
        }
    }
}

impl<V: Send + 'static> Structural for Record<V> {
    type Value = V;

    fn tag(&self) -> Tag {
        self.tag.clone()
    }

    fn value(&self) -> &V {
        &self.value
    }

    fn with_value(&self, value: V) -> Self {
        Self {
            tag: self.tag.clone(),
            value,
        }
    }
}

/// Dynamic components: any JSON object of the form
/// `{"type": "<tag>", "value": <payload>}`. The payload type is [`Json`].
impl Component for Json {
    fn type_of(&self) -> Result<Tag> {
        match self.get("type") {
            Some(Json::String(name)) => Ok(Tag::new(name.clone())),
            Some(other) => Err(EcsError::MalformedComponent(format!(
                "`type` must be a string, found {other}"
            ))),
            None => Err(EcsError::MalformedComponent(format!(
                "missing `type` field in {self}"
            ))),
        }
    }

    fn value_of(&self) -> Result<&dyn Any> {
        match self.get("value") {
            Some(value) => Ok(value as &dyn Any),
            None => Err(EcsError::MalformedComponent(format!(
                "missing `value` field in {self}"
            ))),
        }
    }

    fn update(&self, transform: Transform) -> Result<BoxedComponent> {
        let tag = self.type_of()?;
        let next = transform(self.value_of()?)?
            .downcast::<Json>()
            .map_err(|_| EcsError::payload_type::<Json>(&tag))?;
        let mut updated = self.clone();
        updated["value"] = *next;
        Ok(Box::new(updated))
    }
}
