//! Change notification for dependent structures.
//!
//! Mutations are dispatched synchronously to registered listeners in the
//! order they occurred, strictly after the store and all indexes have been
//! updated — a listener never observes a mutation in progress.
//!
//! During bulk operations the accumulate/flush bracket buffers and merges
//! events so a bulk insert of n records produces one notification, not n.

use crate::ids::ObjectId;

/// A batch of completed mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataStoreEvent {
    /// Identifiers of inserted records.
    pub inserts: Vec<ObjectId>,
    /// Identifiers of removed records.
    pub removals: Vec<ObjectId>,
}

impl DataStoreEvent {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.removals.is_empty()
    }

    /// Record insertions. An id whose removal was still buffered is treated
    /// as re-inserted, not as removed-and-inserted.
    fn merge_inserts(&mut self, ids: &[ObjectId]) {
        for id in ids {
            self.removals.retain(|r| r != id);
            self.inserts.push(*id);
        }
    }

    /// Record removals. A removal cancels a buffered insertion of the same
    /// id, so a flush never reports an id on both sides.
    fn merge_removals(&mut self, ids: &[ObjectId]) {
        for id in ids {
            if let Some(pos) = self.inserts.iter().position(|i| i == id) {
                self.inserts.remove(pos);
            } else {
                self.removals.push(*id);
            }
        }
    }
}

/// Observer of database content changes.
pub trait DataStoreListener {
    /// Called after a mutation (or a flushed batch of mutations) completed.
    fn content_changed(&mut self, event: &DataStoreEvent);
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Collects mutation events and dispatches them to listeners.
pub struct EventManager {
    listeners: Vec<(ListenerId, Box<dyn DataStoreListener>)>,
    next_listener: u64,
    accumulating: bool,
    pending: DataStoreEvent,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_listener: 0,
            accumulating: false,
            pending: DataStoreEvent::default(),
        }
    }

    /// Register a listener; the returned handle removes it again.
    pub fn add_listener(&mut self, listener: Box<dyn DataStoreListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns false if the handle is unknown.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Enter accumulate mode: buffer events until [`EventManager::flush`].
    pub fn accumulate(&mut self) {
        self.accumulating = true;
    }

    /// Deliver buffered events as one merged notification and leave
    /// accumulate mode. A no-op when nothing is buffered.
    pub fn flush(&mut self) {
        self.accumulating = false;
        let event = std::mem::take(&mut self.pending);
        if !event.is_empty() {
            self.dispatch(&event);
        }
    }

    pub fn objects_inserted(&mut self, ids: &[ObjectId]) {
        if ids.is_empty() {
            return;
        }
        if self.accumulating {
            self.pending.merge_inserts(ids);
        } else {
            self.dispatch(&DataStoreEvent {
                inserts: ids.to_vec(),
                removals: Vec::new(),
            });
        }
    }

    pub fn objects_removed(&mut self, ids: &[ObjectId]) {
        if ids.is_empty() {
            return;
        }
        if self.accumulating {
            self.pending.merge_removals(ids);
        } else {
            self.dispatch(&DataStoreEvent {
                inserts: Vec::new(),
                removals: ids.to_vec(),
            });
        }
    }

    fn dispatch(&mut self, event: &DataStoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener.content_changed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        events: Rc<RefCell<Vec<DataStoreEvent>>>,
    }

    impl DataStoreListener for Recorder {
        fn content_changed(&mut self, event: &DataStoreEvent) {
            self.events.borrow_mut().push(event.clone());
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<DataStoreEvent>>>, Box<Recorder>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let listener = Box::new(Recorder {
            events: Rc::clone(&events),
        });
        (events, listener)
    }

    fn id(raw: u32) -> ObjectId {
        ObjectId::from_raw(raw)
    }

    #[test]
    fn test_immediate_dispatch() {
        let mut mgr = EventManager::new();
        let (events, listener) = recorder();
        mgr.add_listener(listener);

        mgr.objects_inserted(&[id(1)]);
        mgr.objects_removed(&[id(1)]);
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_accumulate_merges_to_single_event() {
        let mut mgr = EventManager::new();
        let (events, listener) = recorder();
        mgr.add_listener(listener);

        mgr.accumulate();
        mgr.objects_inserted(&[id(1)]);
        mgr.objects_inserted(&[id(2)]);
        mgr.objects_removed(&[id(1)]);
        assert!(events.borrow().is_empty());

        mgr.flush();
        let events = events.borrow();
        assert_eq!(events.len(), 1);
        // Insert of 1 was cancelled by its removal inside the bracket.
        assert_eq!(events[0].inserts, vec![id(2)]);
        assert!(events[0].removals.is_empty());
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let mut mgr = EventManager::new();
        let (events, listener) = recorder();
        let handle = mgr.add_listener(listener);
        assert!(mgr.remove_listener(handle));
        assert!(!mgr.remove_listener(handle));

        mgr.objects_inserted(&[id(1)]);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_flush_without_events_is_noop() {
        let mut mgr = EventManager::new();
        let (events, listener) = recorder();
        mgr.add_listener(listener);

        mgr.accumulate();
        mgr.flush();
        assert!(events.borrow().is_empty());
    }
}
