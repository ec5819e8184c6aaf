//! Progress channel between the engine and whoever renders it.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Cloneable handle the pipeline and matcher report through.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event. Dropped silently once nobody is listening.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half, drained by the CLI progress renderer.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    /// Unbounded pair. Progress must never stall a worker.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose receiver is already dropped, for runs without progress output.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FingerprintEvent, FingerprintProgress};
    use std::thread;

    #[test]
    fn events_cross_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Fingerprint(FingerprintEvent::Progress(
                FingerprintProgress {
                    completed: 3,
                    total: 10,
                    current_identity: "banner_ad.png".to_string(),
                },
            )));
        });
        handle.join().unwrap();

        match receiver.recv() {
            Some(Event::Fingerprint(FingerprintEvent::Progress(p))) => {
                assert_eq!(p.completed, 3);
                assert_eq!(p.current_identity, "banner_ad.png");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn iteration_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::new();
        let second = sender.clone();

        sender.send(Event::Fingerprint(FingerprintEvent::Started {
            source: "meta".to_string(),
            total_assets: 2,
        }));
        drop(sender);
        drop(second);

        assert_eq!(receiver.iter().count(), 1);
    }

    #[test]
    fn null_sender_discards() {
        null_sender().send(Event::Fingerprint(FingerprintEvent::Started {
            source: "local".to_string(),
            total_assets: 0,
        }));
    }
}
