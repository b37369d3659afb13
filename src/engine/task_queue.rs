use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// A unit of game logic. It runs once, on the consumer thread, with exclusive
/// access to the consumer's context.
pub type Task<C> = Box<dyn FnOnce(&mut C) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TaskQueueError {
    #[error("task queue is closed")]
    Closed,
}

enum Envelope<C> {
    Run(Task<C>),
    Close,
}

enum TimerCommand<C> {
    Schedule { due: Instant, task: Task<C> },
    Shutdown,
}

struct Scheduled<C> {
    due: Instant,
    seq: u64,
    task: Task<C>,
}

impl<C> PartialEq for Scheduled<C> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<C> Eq for Scheduled<C> {}

impl<C> PartialOrd for Scheduled<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for Scheduled<C> {
    // Reversed so the BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Producer side of a [`TaskQueue`]. Cheap to clone and usable from any thread.
pub struct TaskHandle<C> {
    sender: Sender<Envelope<C>>,
    timer: Sender<TimerCommand<C>>,
    closed: Arc<RwLock<bool>>,
}

impl<C> Clone for TaskHandle<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            timer: self.timer.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<C> TaskHandle<C> {
    pub fn add_task(&self, task: impl FnOnce(&mut C) + Send + 'static) -> Result<(), TaskQueueError> {
        forward(&self.sender, &self.closed, Box::new(task))
    }

    /// Enqueues `task` once `delay` has passed. Tasks still waiting when the
    /// queue closes are dropped.
    pub fn add_task_after(
        &self,
        delay: Duration,
        task: impl FnOnce(&mut C) + Send + 'static,
    ) -> Result<(), TaskQueueError> {
        if self.is_closed() {
            return Err(TaskQueueError::Closed);
        }
        self.timer
            .send(TimerCommand::Schedule {
                due: Instant::now() + delay,
                task: Box::new(task),
            })
            .map_err(|_| TaskQueueError::Closed)
    }

    /// Rejects further tasks. The consumer still runs everything submitted
    /// before the close, then `run` returns.
    pub fn close(&self) -> Result<(), TaskQueueError> {
        let mut closed = self
            .closed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *closed {
            return Err(TaskQueueError::Closed);
        }
        *closed = true;
        self.sender
            .send(Envelope::Close)
            .map_err(|_| TaskQueueError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        *self
            .closed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn forward<C>(
    sender: &Sender<Envelope<C>>,
    closed: &RwLock<bool>,
    task: Task<C>,
) -> Result<(), TaskQueueError> {
    // Holding the read lock across the send orders every accepted task
    // before the close marker.
    let closed = closed
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if *closed {
        return Err(TaskQueueError::Closed);
    }
    sender
        .send(Envelope::Run(task))
        .map_err(|_| TaskQueueError::Closed)
}

/// Multi-producer, single-consumer FIFO of tasks.
///
/// The queue owns the consumer end; hand out [`TaskHandle`]s to producers.
/// Delayed submissions go through a timer thread which feeds them into the
/// same FIFO when due, so the consumer only ever sees one ordered stream.
pub struct TaskQueue<C: 'static> {
    handle: TaskHandle<C>,
    receiver: Receiver<Envelope<C>>,
    timer: Option<JoinHandle<()>>,
}

impl<C: 'static> TaskQueue<C> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        let (timer_sender, timer_receiver) = unbounded();
        let closed = Arc::new(RwLock::new(false));

        let timer = {
            let sender = sender.clone();
            let closed = Arc::clone(&closed);
            std::thread::spawn(move || run_timer(timer_receiver, sender, closed))
        };

        Self {
            handle: TaskHandle {
                sender,
                timer: timer_sender,
                closed,
            },
            receiver,
            timer: Some(timer),
        }
    }

    pub fn handle(&self) -> TaskHandle<C> {
        self.handle.clone()
    }

    /// Runs tasks in submission order, blocking while the queue is empty,
    /// until the queue is closed.
    pub fn run(&self, context: &mut C) {
        while let Ok(envelope) = self.receiver.recv() {
            match envelope {
                Envelope::Run(task) => task(context),
                Envelope::Close => break,
            }
        }
    }

    /// Runs whatever is queued right now without blocking and returns how many
    /// tasks ran. Tasks enqueued by those tasks run too.
    pub fn run_pending(&self, context: &mut C) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(Envelope::Run(task)) => {
                    task(context);
                    ran += 1;
                }
                Ok(Envelope::Close) | Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return ran;
                }
            }
        }
    }
}

impl<C: 'static> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Drop for TaskQueue<C> {
    fn drop(&mut self) {
        let _ = self.handle.timer.send(TimerCommand::Shutdown);
        if let Some(timer) = self.timer.take() {
            if timer.join().is_err() {
                tracing::error!("task timer thread panicked");
            }
        }
    }
}

fn run_timer<C>(
    commands: Receiver<TimerCommand<C>>,
    queue: Sender<Envelope<C>>,
    closed: Arc<RwLock<bool>>,
) {
    let mut pending: BinaryHeap<Scheduled<C>> = BinaryHeap::new();
    let mut seq = 0u64;
    loop {
        let now = Instant::now();
        while pending.peek().is_some_and(|next| next.due <= now) {
            if let Some(due) = pending.pop() {
                if forward(&queue, &closed, due.task).is_err() {
                    pending.clear();
                }
            }
        }

        let command = match pending.peek() {
            Some(next) => commands.recv_timeout(next.due.saturating_duration_since(now)),
            None => commands
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match command {
            Ok(TimerCommand::Schedule { due, task }) => {
                seq += 1;
                pending.push(Scheduled { due, seq, task });
            }
            Ok(TimerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
