//! Single-threaded event loop with named events and deferred tasks.
//!
//! Subscribers register for an event name. [`EventLoop::process`] delivers
//! each queued event to its subscribers synchronously, in registration order.
//! Handlers never call back into the loop; they push follow-up events and
//! deferred tasks into an [`Outbox`].
//!
//! Ordering: all queued events (including those emitted while handling) are
//! dispatched before any deferred task runs. Deferred tasks posted during one
//! round run in the next round, after the events they emitted are dispatched.

use std::collections::VecDeque;

use crate::error::Result;

/// An event with a stable name subscribers can register for.
pub trait Event {
    fn name(&self) -> &'static str;
}

type Handler<E> = Box<dyn FnMut(&E, &mut Outbox<E>) -> Result<()>>;
type Task<E> = Box<dyn FnOnce(&mut Outbox<E>) -> Result<()>>;

/// Collects events and tasks produced by a handler or task.
pub struct Outbox<E> {
    events: Vec<E>,
    tasks: Vec<Task<E>>,
}

impl<E> Default for Outbox<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

impl<E> Outbox<E> {
    /// Queue an event behind everything already queued.
    pub fn emit(&mut self, event: E) {
        self.events.push(event);
    }

    /// Schedule a task for the next loop iteration.
    pub fn post(&mut self, task: impl FnOnce(&mut Outbox<E>) -> Result<()> + 'static) {
        self.tasks.push(Box::new(task));
    }
}

/// Event queue plus deferred task queue.
pub struct EventLoop<E: Event> {
    subscribers: Vec<(&'static str, Handler<E>)>,
    queue: VecDeque<E>,
    tasks: VecDeque<Task<E>>,
}

impl<E: Event> Default for EventLoop<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            queue: VecDeque::new(),
            tasks: VecDeque::new(),
        }
    }
}

impl<E: Event> EventLoop<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `name`.
    pub fn subscribe(
        &mut self,
        name: &'static str,
        handler: impl FnMut(&E, &mut Outbox<E>) -> Result<()> + 'static,
    ) {
        self.subscribers.push((name, Box::new(handler)));
    }

    /// Queue an event; it is delivered by the next [`process`](Self::process).
    pub fn emit(&mut self, event: E) {
        self.queue.push_back(event);
    }

    /// Schedule a deferred task.
    pub fn post(&mut self, task: impl FnOnce(&mut Outbox<E>) -> Result<()> + 'static) {
        self.tasks.push_back(Box::new(task));
    }

    /// Whether anything is waiting to run.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.tasks.is_empty()
    }

    /// Run until both queues are empty.
    ///
    /// Stops at the first handler error; whatever is still queued stays queued.
    pub fn process(&mut self) -> Result<()> {
        loop {
            while let Some(event) = self.queue.pop_front() {
                self.dispatch(&event)?;
            }
            if self.tasks.is_empty() {
                return Ok(());
            }
            let mut round: VecDeque<Task<E>> = self.tasks.drain(..).collect();
            while let Some(task) = round.pop_front() {
                let mut outbox = Outbox::default();
                let result = task(&mut outbox);
                self.absorb(outbox);
                if let Err(e) = result {
                    // unrun tasks of this round go ahead of anything posted during it
                    while let Some(pending) = round.pop_back() {
                        self.tasks.push_front(pending);
                    }
                    return Err(e);
                }
            }
        }
    }

    fn dispatch(&mut self, event: &E) -> Result<()> {
        let name = event.name();
        tracing::trace!("Dispatching {name}");
        for (subscribed, handler) in self.subscribers.iter_mut() {
            if *subscribed != name {
                continue;
            }
            let mut outbox = Outbox::default();
            let result = handler(event, &mut outbox);
            self.queue.extend(outbox.events);
            self.tasks.extend(outbox.tasks);
            result?;
        }
        Ok(())
    }

    fn absorb(&mut self, outbox: Outbox<E>) {
        self.queue.extend(outbox.events);
        self.tasks.extend(outbox.tasks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EditorError, TagdockError};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping(u32),
        Pong(u32),
    }

    impl Event for TestEvent {
        fn name(&self) -> &'static str {
            match self {
                TestEvent::Ping(_) => "ping",
                TestEvent::Pong(_) => "pong",
            }
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl FnMut(&TestEvent, &mut Outbox<TestEvent>) -> Result<()> {
        let log = log.clone();
        move |event, _| {
            log.borrow_mut().push(format!("{tag}:{event:?}"));
            Ok(())
        }
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let log: Log = Rc::default();
        let mut events: EventLoop<TestEvent> = EventLoop::new();
        events.subscribe("ping", recorder(&log, "first"));
        events.subscribe("pong", recorder(&log, "other"));
        events.subscribe("ping", recorder(&log, "second"));

        events.emit(TestEvent::Ping(1));
        events.process().unwrap();

        assert_eq!(*log.borrow(), vec!["first:Ping(1)", "second:Ping(1)"]);
        assert!(events.is_idle());
    }

    #[test]
    fn test_follow_up_events_are_dispatched() {
        let log: Log = Rc::default();
        let mut events: EventLoop<TestEvent> = EventLoop::new();
        events.subscribe("ping", |event, outbox| {
            if let TestEvent::Ping(n) = event {
                outbox.emit(TestEvent::Pong(*n + 1));
            }
            Ok(())
        });
        events.subscribe("pong", recorder(&log, "pong"));

        events.emit(TestEvent::Ping(1));
        events.process().unwrap();
        assert_eq!(*log.borrow(), vec!["pong:Pong(2)"]);
    }

    #[test]
    fn test_deferred_task_runs_after_pending_events() {
        let log: Log = Rc::default();
        let mut events: EventLoop<TestEvent> = EventLoop::new();

        let task_log = log.clone();
        events.subscribe("ping", move |_, outbox| {
            let task_log = task_log.clone();
            outbox.post(move |_| {
                task_log.borrow_mut().push("deferred".to_string());
                Ok(())
            });
            outbox.emit(TestEvent::Pong(9));
            Ok(())
        });
        events.subscribe("pong", recorder(&log, "pong"));

        events.emit(TestEvent::Ping(1));
        events.process().unwrap();
        assert_eq!(*log.borrow(), vec!["pong:Pong(9)", "deferred"]);
    }

    #[test]
    fn test_tasks_can_emit_events() {
        let log: Log = Rc::default();
        let mut events: EventLoop<TestEvent> = EventLoop::new();
        events.subscribe("pong", recorder(&log, "pong"));
        events.post(|outbox| {
            outbox.emit(TestEvent::Pong(3));
            Ok(())
        });
        events.process().unwrap();
        assert_eq!(*log.borrow(), vec!["pong:Pong(3)"]);
    }

    #[test]
    fn test_handler_error_stops_processing() {
        let log: Log = Rc::default();
        let mut events: EventLoop<TestEvent> = EventLoop::new();
        events.subscribe("ping", |_, _| {
            Err(TagdockError::Editor(EditorError::NoActiveImage))
        });
        events.subscribe("ping", recorder(&log, "never"));

        events.emit(TestEvent::Ping(1));
        events.emit(TestEvent::Ping(2));
        assert!(events.process().is_err());
        assert!(log.borrow().is_empty());
        assert!(!events.is_idle());
    }

    #[test]
    fn test_task_error_keeps_remaining_tasks() {
        let log: Log = Rc::default();
        let mut events: EventLoop<TestEvent> = EventLoop::new();
        events.post(|_| Err(TagdockError::Editor(EditorError::NoActiveImage)));
        let task_log = log.clone();
        events.post(move |_| {
            task_log.borrow_mut().push("second".to_string());
            Ok(())
        });

        assert!(events.process().is_err());
        assert!(log.borrow().is_empty());
        assert!(!events.is_idle());

        events.process().unwrap();
        assert_eq!(*log.borrow(), vec!["second"]);
        assert!(events.is_idle());
    }
}
