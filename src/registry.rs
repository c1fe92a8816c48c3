//! Process-wide registry of live channels, keyed by [`ChannelId`].
//!
//! Entries are weak: the registry never keeps a channel alive. A lookup only
//! succeeds while at least one handle still holds the channel, and teardown
//! removes the entry, so a stale id yields `UnknownChannel` instead of
//! touching freed state.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use crate::types::ChannelId;

type Entry = Weak<dyn Any + Send + Sync>;

static REGISTRY: OnceLock<Mutex<HashMap<ChannelId, Entry>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<ChannelId, Entry>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(crate) fn register<S>(id: ChannelId, shared: &Arc<S>)
where
    S: Any + Send + Sync,
{
    let weak: Weak<S> = Arc::downgrade(shared);
    let entry: Entry = weak;
    registry().lock().insert(id, entry);
}

pub(crate) fn unregister(id: ChannelId) {
    registry().lock().remove(&id);
}

/// Upgrade the entry for `id` to a strong reference of type `S`.
///
/// Returns `None` if the id was never issued, has been torn down, or names
/// a channel of a different payload type.
pub(crate) fn lookup<S>(id: ChannelId) -> Option<Arc<S>>
where
    S: Any + Send + Sync,
{
    // Clone the weak entry out first: a failed downcast below may drop the
    // last strong reference, and teardown takes the registry lock.
    let entry = registry().lock().get(&id).cloned()?;
    let strong = entry.upgrade()?;
    strong.downcast::<S>().ok()
}

/// True while some handle still keeps the channel `id` alive.
pub fn is_live(id: ChannelId) -> bool {
    registry()
        .lock()
        .get(&id)
        .is_some_and(|entry| entry.strong_count() > 0)
}
