//! Entity handles
//!
//! An [`Entity`] is a cheap, clonable handle to a worker task that owns one
//! entity's component map. Every operation is a request/response round trip
//! through the worker's mailbox, so operations on one entity never
//! interleave while separate entities run fully in parallel.

use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use super::component::{BoxedComponent, Component, Payload, Transform};
use super::worker::{Command, Worker};
use super::Tag;
use crate::config::StoreConfig;
use crate::error::{BoxError, EcsError, Result};

/// Process-unique entity number, used in diagnostics.
pub type EntityId = u64;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a live entity store.
///
/// Two handles are equal iff they address the same entity.
#[derive(Clone)]
pub struct Entity {
    id: EntityId,
    commands: mpsc::Sender<Command>,
    timeout: Option<Duration>,
}

impl Entity {
    /// Spawns an entity seeded with `initial`, keyed by each component's
    /// [`Component::type_of`]. When two components share a tag the later one
    /// wins.
    ///
    /// Must be called from within a Tokio runtime, otherwise
    /// [`EcsError::NoRuntime`] is returned.
    pub fn new<I>(initial: I) -> Result<Self>
    where
        I: IntoIterator<Item = BoxedComponent>,
    {
        Self::with_config(&StoreConfig::default(), initial)
    }

    pub fn with_config<I>(config: &StoreConfig, initial: I) -> Result<Self>
    where
        I: IntoIterator<Item = BoxedComponent>,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| EcsError::NoRuntime)?;

        let mut components = HashMap::new();
        for component in initial {
            let tag = component.type_of()?;
            components.insert(tag, component);
        }

        let id = NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed);
        let (commands, mailbox) = mpsc::channel(config.mailbox_capacity);
        runtime.spawn(Worker::new(id, components, mailbox).run());

        Ok(Self {
            id,
            commands,
            timeout: config.request_timeout(),
        })
    }

    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// False once the worker has stopped accepting requests.
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Inserts `component` unless its tag is already present, in which case
    /// the resident component is kept.
    pub async fn attach(&self, component: impl Component) -> Result<&Self> {
        self.attach_boxed(Box::new(component)).await
    }

    pub async fn attach_boxed(&self, component: BoxedComponent) -> Result<&Self> {
        let tag = component.type_of()?;
        self.request(|reply| Command::Attach {
            tag,
            component,
            reply,
        })
        .await?;
        Ok(self)
    }

    /// Removes the component under `tag`, if any.
    pub async fn detach(&self, tag: impl Into<Tag>) -> Result<&Self> {
        let tag = tag.into();
        self.request(|reply| Command::Detach { tag, reply }).await?;
        Ok(self)
    }

    /// Returns a copy of the payload stored under `tag`.
    pub async fn get<V>(&self, tag: impl Into<Tag>) -> Result<V>
    where
        V: Any + Clone + Send,
    {
        let tag = tag.into();
        let read_tag = tag.clone();
        let read: Transform = Box::new(move |value: &dyn Any| {
            value
                .downcast_ref::<V>()
                .map(|value| Box::new(value.clone()) as Payload)
                .ok_or_else(|| EcsError::payload_type::<V>(&read_tag))
        });
        let payload = self
            .request(|reply| Command::Read {
                tag: tag.clone(),
                read,
                reply,
            })
            .await??;
        payload
            .downcast::<V>()
            .map(|value| *value)
            .map_err(|_| EcsError::payload_type::<V>(&tag))
    }

    pub async fn has(&self, tag: impl Into<Tag>) -> Result<bool> {
        self.has_all([tag]).await
    }

    /// True iff every tag is present; true for an empty sequence.
    pub async fn has_all<I, T>(&self, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let tags = tags.into_iter().map(Into::into).collect();
        self.request(|reply| Command::Contains { tags, reply }).await
    }

    /// Replaces the payload under `tag` with `value`.
    pub async fn set<V>(&self, tag: impl Into<Tag>, value: V) -> Result<&Self>
    where
        V: Any + Send,
    {
        let transform: Transform = Box::new(move |_: &dyn Any| Ok(Box::new(value) as Payload));
        self.apply(tag.into(), transform).await
    }

    /// Replaces the payload under `tag` with `f(old)`. If `f` fails the
    /// stored component is left exactly as it was.
    pub async fn update<V, F, E>(&self, tag: impl Into<Tag>, f: F) -> Result<&Self>
    where
        V: Any + Clone + Send,
        F: FnOnce(V) -> Result<V, E> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let tag = tag.into();
        let transform_tag = tag.clone();
        let transform: Transform = Box::new(move |old: &dyn Any| {
            let old = old
                .downcast_ref::<V>()
                .cloned()
                .ok_or_else(|| EcsError::payload_type::<V>(&transform_tag))?;
            f(old)
                .map(|next| Box::new(next) as Payload)
                .map_err(|source| EcsError::TransformFailed {
                    tag: transform_tag,
                    source: source.into(),
                })
        });
        self.apply(tag, transform).await
    }

    /// [`Entity::update`] for transforms that cannot fail.
    pub async fn modify<V, F>(&self, tag: impl Into<Tag>, f: F) -> Result<&Self>
    where
        V: Any + Clone + Send,
        F: FnOnce(V) -> V + Send + 'static,
    {
        self.update(tag, move |old: V| Ok::<V, Infallible>(f(old)))
            .await
    }

    /// Resident tags, sorted.
    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.request(|reply| Command::Tags { reply }).await
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.tags().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Stops the worker once the requests queued ahead of this one have been
    /// served. Later requests on any handle fail with [`EcsError::Terminated`].
    pub async fn terminate(&self) {
        if self
            .request(|reply| Command::Terminate { reply })
            .await
            .is_err()
        {
            trace!(entity = self.id, "terminate on stopped entity");
        }
    }

    async fn apply(&self, tag: Tag, transform: Transform) -> Result<&Self> {
        self.request(|reply| Command::Update {
            tag,
            transform,
            reply,
        })
        .await??;
        Ok(self)
    }

    /// Queues a command and waits for its reply. The optional timeout only
    /// bounds the wait for mailbox space: once a command is queued the caller
    /// always receives its real outcome.
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = make(reply_tx);

        let sent = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.commands.send(command))
                .await
                .map_err(|_| EcsError::Timeout {
                    millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })?,
            None => self.commands.send(command).await,
        };
        sent.map_err(|_| EcsError::Terminated)?;

        reply_rx.await.map_err(|_| EcsError::Terminated)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.commands.same_channel(&other.commands)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Collects the initial components of an entity before spawning it.
#[derive(Default)]
pub struct EntityBuilder {
    config: StoreConfig,
    components: Vec<BoxedComponent>,
}

impl EntityBuilder {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            components: Vec::new(),
        }
    }

    pub fn with(mut self, component: impl Component) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn spawn(self) -> Result<Entity> {
        Entity::with_config(&self.config, self.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Record;

    #[tokio::test]
    async fn test_handles_share_identity() {
        let entity = Entity::new(Vec::new()).unwrap();
        let other = Entity::new(Vec::new()).unwrap();
        let copy = entity.clone();

        assert_eq!(entity, copy);
        assert_ne!(entity, other);
        assert_ne!(entity.id(), other.id());
    }

    #[tokio::test]
    async fn test_duplicate_initial_tags_keep_last() {
        let entity = Entity::builder()
            .with(Record::new("hp", 10_i64))
            .with(Record::new("hp", 20_i64))
            .spawn()
            .unwrap();

        assert_eq!(entity.get::<i64>("hp").await.unwrap(), 20);
        assert_eq!(entity.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_terminate_drains_then_stops() {
        let entity = Entity::builder()
            .with(Record::new("hp", 1_i64))
            .spawn()
            .unwrap();

        entity.terminate().await;
        assert!(matches!(
            entity.get::<i64>("hp").await,
            Err(EcsError::Terminated)
        ));
        assert!(!entity.is_alive());
        // second terminate is harmless
        entity.terminate().await;
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        assert!(matches!(
            Entity::new(Vec::new()),
            Err(EcsError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_rejected() {
        let config = StoreConfig {
            mailbox_capacity: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            Entity::with_config(&config, Vec::new()),
            Err(EcsError::Config(_))
        ));
    }
}
