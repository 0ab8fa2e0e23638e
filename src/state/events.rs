//! Change notifications.
//!
//! The model reports every mutation as a [`TimelineEvent`], delivered
//! synchronously to each subscriber before the mutating call returns.
//! Handlers only see the event, never the model, so they cannot re-enter it
//! while an edit is half done.

use super::{ItemConnId, ItemId, ItemOperation, RoleMask};

/// A single notification from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    ItemCreated(ItemId),
    /// Sent while the item is still fully present
    ItemAboutToBeRemoved(ItemId),
    ItemRemoved(ItemId),
    ItemChanged { id: ItemId, roles: RoleMask },
    ItemOperateFinished { id: ItemId, op: ItemOperation, param: i64 },
    ConnectionCreated(ItemConnId),
    ConnectionRemoved(ItemConnId),
    RowCountChanged(usize),
    /// The item's vertical position may have moved
    RequestUpdateItemY(ItemId),
    FrameMinimumChanged(i64),
    FrameMaximumChanged(i64),
    ViewFrameMinimumChanged(i64),
    ViewFrameMaximumChanged(i64),
    FpsChanged(f64),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&TimelineEvent)>;

/// Registered event handlers, called in subscription order.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl Observers {
    pub fn subscribe(&mut self, handler: impl FnMut(&TimelineEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() < len
    }

    pub fn emit(&mut self, event: TimelineEvent) {
        tracing::trace!(?event, "timeline event");
        for (_, handler) in self.handlers.iter_mut() {
            handler(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_delivery_order_and_unsubscribe() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::default();

        let first_log = Rc::clone(&log);
        let first = observers
            .subscribe(move |event| first_log.borrow_mut().push(("first", event.clone())));
        let second_log = Rc::clone(&log);
        observers.subscribe(move |event| second_log.borrow_mut().push(("second", event.clone())));

        observers.emit(TimelineEvent::RowCountChanged(2));
        assert!(observers.unsubscribe(first));
        assert!(!observers.unsubscribe(first));
        observers.emit(TimelineEvent::RowCountChanged(3));

        assert_eq!(
            *log.borrow(),
            vec![
                ("first", TimelineEvent::RowCountChanged(2)),
                ("second", TimelineEvent::RowCountChanged(2)),
                ("second", TimelineEvent::RowCountChanged(3)),
            ]
        );
        assert_eq!(observers.len(), 1);
    }
}
