//! Named-event publish/subscribe

use std::collections::HashMap;
use std::hash::Hash;

/// Registration handle returned by `EventEmitter::on`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<P> = Box<dyn FnMut(&P)>;

/// Synchronous event emitter keyed by event name
///
/// Every `on` is an independent registration, so the same closure logic may
/// be registered several times. Listeners run in registration order.
pub struct EventEmitter<K, P> {
    listeners: HashMap<K, Vec<(ListenerId, Listener<P>)>>,
    next_id: u64,
}

impl<K: Eq + Hash, P> EventEmitter<K, P> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a listener for `name`
    pub fn on(&mut self, name: K, listener: impl FnMut(&P) + 'static) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(name).or_default().push((id, Box::new(listener)));
        id
    }

    /// Remove a registration; returns whether it existed
    pub fn off(&mut self, name: &K, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(name) else {
            return false;
        };
        let Some(index) = list.iter().position(|(lid, _)| *lid == id) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.listeners.remove(name);
        }
        true
    }

    /// Invoke every listener registered for `name`
    pub fn emit(&mut self, name: &K, payload: &P) {
        if let Some(list) = self.listeners.get_mut(name) {
            for (_, listener) in list.iter_mut() {
                listener(payload);
            }
        }
    }

    /// Number of registrations for `name`
    pub fn listener_count(&self, name: &K) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    /// Remove all listeners for all names
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<K: Eq + Hash, P> Default for EventEmitter<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: std::fmt::Debug, P> std::fmt::Debug for EventEmitter<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, list) in &self.listeners {
            map.entry(name, &list.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut emitter: EventEmitter<&str, u32> = EventEmitter::new();
        for tag in ["first", "second"] {
            let log = log.clone();
            emitter.on("tick", move |n| log.borrow_mut().push(format!("{tag}:{n}")));
        }
        emitter.emit(&"tick", &7);
        emitter.emit(&"unknown", &8);
        assert_eq!(*log.borrow(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn test_duplicate_registrations_are_independent() {
        let count = Rc::new(RefCell::new(0));
        let mut emitter: EventEmitter<&str, ()> = EventEmitter::new();
        let ids: Vec<ListenerId> = (0..2)
            .map(|_| {
                let count = count.clone();
                emitter.on("x", move |_| *count.borrow_mut() += 1)
            })
            .collect();

        assert!(emitter.off(&"x", ids[0]));
        assert!(!emitter.off(&"x", ids[0]));
        emitter.emit(&"x", &());
        assert_eq!(*count.borrow(), 1);
        assert_eq!(emitter.listener_count(&"x"), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut emitter: EventEmitter<&str, ()> = EventEmitter::new();
        emitter.on("a", |_| {});
        emitter.on("b", |_| {});
        emitter.clear();
        assert_eq!(emitter.listener_count(&"a"), 0);
        assert_eq!(emitter.listener_count(&"b"), 0);
    }
}
