//! Process-wide pub/sub, queued per frame and dispatched synchronously on
//! whichever thread calls [`EventBus::update`].

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::key::HashKey;

/// The payload carried by an event. Mirrors the tagged union used by the
/// rest of the engine's input/config/scene-lifecycle events.
#[derive(Clone, Debug)]
pub enum EventData {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
    Char(char),
    Str(String),
    I32Pair(i32, i32),
    U32Bool(u32, bool),
    U32Pair(u32, u32),
    F32Pair(f32, f32),
}

#[derive(Clone, Debug)]
pub struct EventInfo {
    pub kind: HashKey,
    pub data: EventData,
}

/// Implemented by anything that wants to receive dispatched events.
pub trait EventListener: Send {
    fn handle_event(&mut self, event: &EventInfo);
}

impl<F: FnMut(&EventInfo) + Send> EventListener for F {
    fn handle_event(&mut self, event: &EventInfo) {
        (self)(event);
    }
}

/// Process-wide event queue and subscriber registry.
///
/// The queue and the listener map are guarded independently: `post` only
/// ever takes the queue lock, `subscribe` only the listener lock, and
/// `update` takes both (queue first) for the duration of the drain.
pub struct EventBus {
    queue: Mutex<Vec<EventInfo>>,
    listeners: Mutex<FxHashMap<u64, Vec<Box<dyn EventListener>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            listeners: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn subscribe(&self, kind: HashKey, listener: Box<dyn EventListener>) {
        self.listeners
            .lock()
            .entry(kind.hash())
            .or_default()
            .push(listener);
    }

    pub fn post(&self, event: EventInfo) {
        self.queue.lock().push(event);
    }

    /// Drains the queue and dispatches each event, in FIFO order, to every
    /// listener subscribed to its kind, in subscription order. Events
    /// posted by a listener during this call are not seen until the next
    /// `update` — the queue is drained up-front, not re-read.
    pub fn update(&self) {
        let mut queue = self.queue.lock();
        let drained: Vec<EventInfo> = std::mem::take(&mut *queue);
        drop(queue);

        let mut listeners = self.listeners.lock();
        for event in &drained {
            if let Some(subscribers) = listeners.get_mut(&event.kind.hash()) {
                for listener in subscribers {
                    listener.handle_event(event);
                }
            }
            // Unknown event kinds are silently dropped.
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn data_i32(info: &EventInfo) -> i32 {
        match info.data {
            EventData::I32(v) => v,
            _ => panic!("expected I32"),
        }
    }

    #[test]
    fn event_routing_preserves_subscription_and_post_order() {
        const A: HashKey = HashKey::new("A");
        const B: HashKey = HashKey::new("B");

        let bus = EventBus::new();
        let l1_received = Arc::new(Mutex::new(Vec::new()));
        let l2_received = Arc::new(Mutex::new(Vec::new()));

        {
            let l1 = l1_received.clone();
            bus.subscribe(
                A,
                Box::new(move |e: &EventInfo| l1.lock().push(data_i32(e))),
            );
        }
        {
            let l2 = l2_received.clone();
            bus.subscribe(
                B,
                Box::new(move |e: &EventInfo| l2.lock().push(data_i32(e))),
            );
        }

        bus.post(EventInfo {
            kind: A,
            data: EventData::I32(1),
        });
        bus.post(EventInfo {
            kind: B,
            data: EventData::I32(2),
        });
        bus.post(EventInfo {
            kind: A,
            data: EventData::I32(3),
        });
        bus.update();

        assert_eq!(*l1_received.lock(), vec![1, 3]);
        assert_eq!(*l2_received.lock(), vec![2]);
    }

    #[test]
    fn unknown_event_kind_is_dropped_silently() {
        const UNSUBSCRIBED: HashKey = HashKey::new("nobody-listens");
        let bus = EventBus::new();
        bus.post(EventInfo {
            kind: UNSUBSCRIBED,
            data: EventData::Bool(true),
        });
        bus.update(); // must not panic
    }

    #[test]
    fn events_posted_during_dispatch_wait_for_next_update() {
        const A: HashKey = HashKey::new("A");
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        bus.subscribe(
            A,
            Box::new(move |e: &EventInfo| {
                seen_clone.lock().push(data_i32(e));
            }),
        );

        bus.post(EventInfo {
            kind: A,
            data: EventData::I32(1),
        });
        bus.update();
        assert_eq!(*seen.lock(), vec![1]);

        bus.post(EventInfo {
            kind: A,
            data: EventData::I32(2),
        });
        assert_eq!(*seen.lock(), vec![1]); // not yet dispatched
        bus.update();
        assert_eq!(*seen.lock(), vec![1, 2]);
    }
}
