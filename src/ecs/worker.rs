//! Entity worker: the single task that owns an entity's component map.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use super::component::{BoxedComponent, Payload, Transform};
use super::{EntityId, Tag};
use crate::error::{EcsError, Result};

/// Requests handled by an entity worker, one at a time.
pub(crate) enum Command {
    Attach {
        tag: Tag,
        component: BoxedComponent,
        reply: oneshot::Sender<bool>,
    },
    Detach {
        tag: Tag,
        reply: oneshot::Sender<bool>,
    },
    /// Runs `read` against the payload and returns its result, storing nothing.
    Read {
        tag: Tag,
        read: Transform,
        reply: oneshot::Sender<Result<Payload>>,
    },
    Contains {
        tags: Vec<Tag>,
        reply: oneshot::Sender<bool>,
    },
    Update {
        tag: Tag,
        transform: Transform,
        reply: oneshot::Sender<Result<()>>,
    },
    Tags {
        reply: oneshot::Sender<Vec<Tag>>,
    },
    Terminate {
        reply: oneshot::Sender<()>,
    },
}

pub(crate) struct Worker {
    id: EntityId,
    components: HashMap<Tag, BoxedComponent>,
    commands: mpsc::Receiver<Command>,
}

impl Worker {
    pub(crate) fn new(
        id: EntityId,
        components: HashMap<Tag, BoxedComponent>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            id,
            components,
            commands,
        }
    }

    /// Processes commands until every handle is dropped or a terminate
    /// request has been drained.
    pub(crate) async fn run(mut self) {
        debug!(
            entity = self.id,
            components = self.components.len(),
            "entity worker started"
        );
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        debug!(entity = self.id, "entity worker stopped");
    }

    fn handle(&mut self, command: Command) {
        // Replies are dropped silently when the caller gave up (timeout).
        match command {
            Command::Attach {
                tag,
                component,
                reply,
            } => {
                let inserted = !self.components.contains_key(&tag);
                if inserted {
                    trace!(entity = self.id, %tag, "attach");
                    self.components.insert(tag, component);
                } else {
                    debug!(entity = self.id, %tag, "attach ignored, tag already present");
                }
                let _ = reply.send(inserted);
            }
            Command::Detach { tag, reply } => {
                let removed = self.components.remove(&tag).is_some();
                trace!(entity = self.id, %tag, removed, "detach");
                let _ = reply.send(removed);
            }
            Command::Read { tag, read, reply } => {
                let result = match self.components.get(&tag) {
                    Some(component) => guarded(&tag, || {
                        component.value_of().and_then(|value| read(value))
                    }),
                    None => Err(EcsError::ComponentNotFound { tag }),
                };
                let _ = reply.send(result);
            }
            Command::Contains { tags, reply } => {
                let present = tags.iter().all(|tag| self.components.contains_key(tag));
                let _ = reply.send(present);
            }
            Command::Update {
                tag,
                transform,
                reply,
            } => {
                let result = self.update(tag, transform);
                if let Err(err) = &result {
                    debug!(entity = self.id, error = %err, "update rejected");
                }
                let _ = reply.send(result);
            }
            Command::Tags { reply } => {
                let mut tags: Vec<Tag> = self.components.keys().cloned().collect();
                tags.sort();
                let _ = reply.send(tags);
            }
            Command::Terminate { reply } => {
                debug!(entity = self.id, "terminate requested");
                // Queued commands still drain; new sends fail.
                self.commands.close();
                let _ = reply.send(());
            }
        }
    }

    /// Swaps in the transformed component only once it has been built.
    fn update(&mut self, tag: Tag, transform: Transform) -> Result<()> {
        let next = match self.components.get(&tag) {
            Some(current) => guarded(&tag, || current.update(transform))?,
            None => return Err(EcsError::ComponentNotFound { tag }),
        };
        trace!(entity = self.id, %tag, "update");
        self.components.insert(tag, next);
        Ok(())
    }
}

/// Runs caller-supplied code on the worker. A panic is reported as a
/// transform failure and the component map is left as it was.
fn guarded<T>(tag: &Tag, run: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|panic| Err(EcsError::from_panic(tag, panic)))
}
