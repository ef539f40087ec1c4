/*
 * Marshals updater ticks onto the UI thread. Every timer thread posts into
 * one FIFO queue and blocks until the UI thread has run its message, so the
 * window and the device are only ever touched from the thread that owns
 * them and ticks execute strictly in submission order.
 *
 * The wait is stop-aware: a sender whose updater is being stopped gives up
 * waiting after at most one poll interval. The message stays queued and is
 * still drained later. Each message carries its sender's epoch, which the
 * overlay uses to turn leftovers from a previous attachment into no-ops.
 */
use crate::updater::StopToken;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

const COMPLETION_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiMessage {
    LogicTick { elapsed: f64 },
    DrawTick { elapsed: f64 },
}

/// Wakes the UI thread's message loop after a message was queued.
pub trait UiWaker: Send + Sync {
    fn wake(&self);
}

/// Waker for hosts that poll `Overlay::pump` themselves.
#[derive(Debug, Default)]
pub struct NoopWaker;

impl UiWaker for NoopWaker {
    fn wake(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The UI thread ran the message.
    Completed,
    /// The sender's updater was stopped before the UI thread got to it.
    Abandoned,
    /// The dispatcher is gone; the message was not run.
    Disconnected,
}

struct Envelope {
    message: UiMessage,
    epoch: u64,
    done: Sender<()>,
}

/// A message taken off the queue. Call `complete` once it has been handled.
pub struct PendingMessage {
    envelope: Envelope,
}

impl PendingMessage {
    pub fn message(&self) -> UiMessage {
        self.envelope.message
    }

    /// Epoch of the sender that queued the message.
    pub fn epoch(&self) -> u64 {
        self.envelope.epoch
    }

    pub fn complete(self) {
        // The sender may have stopped waiting already.
        let _ = self.envelope.done.send(());
    }
}

pub struct Dispatcher {
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    lookahead: Option<Envelope>,
    waker: Arc<dyn UiWaker>,
}

impl Dispatcher {
    pub fn new(waker: Arc<dyn UiWaker>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            lookahead: None,
            waker,
        }
    }

    pub fn sender(&self) -> DispatchSender {
        self.sender_for(0)
    }

    /*
     * A sender whose messages carry `epoch`. The receiving side compares it
     * against its own session counter to recognize ticks queued by updaters
     * that have since been replaced.
     */
    pub fn sender_for(&self, epoch: u64) -> DispatchSender {
        DispatchSender {
            tx: self.tx.clone(),
            epoch,
            waker: Arc::clone(&self.waker),
        }
    }

    pub fn wake(&self) {
        self.waker.wake();
    }

    fn receive(&self) -> Option<Envelope> {
        match self.rx.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Next queued message, if any. Must be called on the UI thread.
    pub fn try_next(&mut self) -> Option<PendingMessage> {
        let envelope = self.lookahead.take().or_else(|| self.receive())?;
        Some(PendingMessage { envelope })
    }

    /// True when `try_next` would return a message. The message is kept for it.
    pub fn has_pending(&mut self) -> bool {
        if self.lookahead.is_none() {
            self.lookahead = self.receive();
        }
        self.lookahead.is_some()
    }

    /// Runs every queued message in submission order; returns how many ran.
    pub fn drain(&mut self, mut handler: impl FnMut(UiMessage)) -> usize {
        let mut handled = 0;
        while let Some(pending) = self.try_next() {
            handler(pending.message());
            pending.complete();
            handled += 1;
        }
        handled
    }
}

#[derive(Clone)]
pub struct DispatchSender {
    tx: Sender<Envelope>,
    epoch: u64,
    waker: Arc<dyn UiWaker>,
}

impl DispatchSender {
    /// Queues `message`, wakes the UI thread and waits until it ran or `stop` is raised.
    pub fn dispatch(&self, message: UiMessage, stop: &StopToken) -> DispatchOutcome {
        let (done_tx, done_rx) = mpsc::channel();
        if self
            .tx
            .send(Envelope {
                message,
                epoch: self.epoch,
                done: done_tx,
            })
            .is_err()
        {
            return DispatchOutcome::Disconnected;
        }
        self.waker.wake();

        loop {
            match done_rx.recv_timeout(COMPLETION_POLL) {
                Ok(()) => return DispatchOutcome::Completed,
                Err(RecvTimeoutError::Timeout) => {
                    if stop.is_stopped() {
                        log::trace!("Dispatcher: abandoning wait for {message:?}");
                        return DispatchOutcome::Abandoned;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return DispatchOutcome::Disconnected,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl UiWaker for CountingWaker {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn drain_until(dispatcher: &mut Dispatcher, count: usize) -> Vec<UiMessage> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while seen.len() < count && Instant::now() < deadline {
            dispatcher.drain(|m| seen.push(m));
            thread::sleep(Duration::from_millis(1));
        }
        seen
    }

    #[test]
    fn messages_run_on_the_draining_thread_in_submission_order() {
        let waker = Arc::new(CountingWaker::default());
        let mut dispatcher = Dispatcher::new(waker.clone());
        let sender = dispatcher.sender();

        let worker = thread::spawn(move || {
            let stop = StopToken::new();
            [
                sender.dispatch(UiMessage::LogicTick { elapsed: 1.0 }, &stop),
                sender.dispatch(UiMessage::DrawTick { elapsed: 2.0 }, &stop),
                sender.dispatch(UiMessage::LogicTick { elapsed: 3.0 }, &stop),
            ]
        });

        let seen = drain_until(&mut dispatcher, 3);
        let outcomes = worker.join().unwrap();

        assert_eq!(
            seen,
            vec![
                UiMessage::LogicTick { elapsed: 1.0 },
                UiMessage::DrawTick { elapsed: 2.0 },
                UiMessage::LogicTick { elapsed: 3.0 },
            ]
        );
        assert!(outcomes.iter().all(|o| *o == DispatchOutcome::Completed));
        assert_eq!(waker.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn each_sender_keeps_its_own_order() {
        let mut dispatcher = Dispatcher::new(Arc::new(NoopWaker));
        let spawn_sender = |draw: bool| {
            let sender = dispatcher.sender();
            thread::spawn(move || {
                let stop = StopToken::new();
                for i in 0..20 {
                    let elapsed = f64::from(i);
                    let message = if draw {
                        UiMessage::DrawTick { elapsed }
                    } else {
                        UiMessage::LogicTick { elapsed }
                    };
                    sender.dispatch(message, &stop);
                }
            })
        };
        let logic = spawn_sender(false);
        let draw = spawn_sender(true);

        let seen = drain_until(&mut dispatcher, 40);
        logic.join().unwrap();
        draw.join().unwrap();

        assert_eq!(seen.len(), 40);
        let logic_order: Vec<f64> = seen
            .iter()
            .filter_map(|m| match m {
                UiMessage::LogicTick { elapsed } => Some(*elapsed),
                UiMessage::DrawTick { .. } => None,
            })
            .collect();
        let expected: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(logic_order, expected);
    }

    #[test]
    fn stopped_sender_abandons_the_wait_but_message_stays_queued() {
        let mut dispatcher = Dispatcher::new(Arc::new(NoopWaker));
        let stop = StopToken::new();
        stop.stop();

        let outcome = dispatcher
            .sender()
            .dispatch(UiMessage::DrawTick { elapsed: 0.5 }, &stop);

        assert_eq!(outcome, DispatchOutcome::Abandoned);
        let mut seen = Vec::new();
        assert_eq!(dispatcher.drain(|m| seen.push(m)), 1);
        assert_eq!(seen, vec![UiMessage::DrawTick { elapsed: 0.5 }]);
    }

    #[test]
    fn dropped_dispatcher_disconnects_senders() {
        let dispatcher = Dispatcher::new(Arc::new(NoopWaker));
        let sender = dispatcher.sender();
        drop(dispatcher);

        let outcome = sender.dispatch(UiMessage::LogicTick { elapsed: 0.1 }, &StopToken::new());
        assert_eq!(outcome, DispatchOutcome::Disconnected);
    }

    #[test]
    fn has_pending_keeps_the_peeked_message_in_order() {
        let mut dispatcher = Dispatcher::new(Arc::new(NoopWaker));
        assert!(!dispatcher.has_pending());

        let stop = StopToken::new();
        stop.stop();
        let sender = dispatcher.sender();
        sender.dispatch(UiMessage::LogicTick { elapsed: 1.0 }, &stop);
        sender.dispatch(UiMessage::DrawTick { elapsed: 2.0 }, &stop);

        assert!(dispatcher.has_pending());
        assert!(dispatcher.has_pending());
        let first = dispatcher.try_next().map(|p| p.message());
        assert_eq!(first, Some(UiMessage::LogicTick { elapsed: 1.0 }));
        assert!(dispatcher.has_pending());
        let second = dispatcher.try_next().map(|p| p.message());
        assert_eq!(second, Some(UiMessage::DrawTick { elapsed: 2.0 }));
        assert!(!dispatcher.has_pending());
        assert!(dispatcher.try_next().is_none());
    }

    #[test]
    fn messages_carry_their_sender_epoch() {
        let mut dispatcher = Dispatcher::new(Arc::new(NoopWaker));
        let stop = StopToken::new();
        stop.stop();
        dispatcher
            .sender()
            .dispatch(UiMessage::LogicTick { elapsed: 0.1 }, &stop);
        dispatcher
            .sender_for(7)
            .dispatch(UiMessage::LogicTick { elapsed: 0.2 }, &stop);

        let epochs: Vec<u64> = std::iter::from_fn(|| dispatcher.try_next())
            .map(|p| p.epoch())
            .collect();
        assert_eq!(epochs, vec![0, 7]);
    }
}
