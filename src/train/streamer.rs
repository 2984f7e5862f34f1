use std::any::Any;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

/// Minibatches buffered ahead of the consumer.
pub const QUEUE_CAPACITY: usize = 3;

enum Message<T> {
    Item(T),
    Failed(Error),
    Done,
}

/// Runs a batch-producing iterator on its own thread and hands the items
/// over through a bounded FIFO queue.
///
/// Items arrive in exactly the order the source yields them. The producer
/// blocks while the queue is full and the consumer blocks while it is empty.
/// An `Err` from the source, or a panic on the producer thread, is delivered
/// to the consumer as the final item.
pub struct MinibatchStreamer<T> {
    receiver: Option<Receiver<Message<T>>>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl<T: Send + 'static> MinibatchStreamer<T> {
    pub fn spawn<I>(source: I) -> Result<Self>
    where
        I: Iterator<Item = Result<T>> + Send + 'static,
    {
        Self::with_capacity(source, QUEUE_CAPACITY)
    }

    pub fn with_capacity<I>(source: I, capacity: usize) -> Result<Self>
    where
        I: Iterator<Item = Result<T>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let worker = thread::Builder::new()
            .name("minibatch-producer".into())
            .spawn(move || produce(source, sender))
            .map_err(|e| Error::Producer(format!("cannot start worker: {}", e)))?;

        Ok(MinibatchStreamer {
            receiver: Some(receiver),
            worker: Some(worker),
            finished: false,
        })
    }

    fn join_worker(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|payload| {
                Error::Producer(format!("worker panicked: {}", panic_message(payload.as_ref())))
            }),
            None => Ok(()),
        }
    }
}

fn produce<T, I>(source: I, sender: SyncSender<Message<T>>)
where
    I: Iterator<Item = Result<T>>,
{
    for item in source {
        let (message, last) = match item {
            Ok(batch) => (Message::Item(batch), false),
            Err(e) => (Message::Failed(e), true),
        };
        // A send error means the consumer hung up; nobody is left to tell.
        if sender.send(message).is_err() || last {
            return;
        }
    }
    let _ = sender.send(Message::Done);
}

impl<T: Send + 'static> Iterator for MinibatchStreamer<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let received = self.receiver.as_ref()?.recv();

        match received {
            Ok(Message::Item(batch)) => Some(Ok(batch)),
            Ok(Message::Failed(e)) => {
                self.finished = true;
                let _ = self.join_worker();
                Some(Err(e))
            }
            Ok(Message::Done) => {
                self.finished = true;
                self.join_worker().err().map(Err)
            }
            // Sender dropped without `Done`: the producer thread panicked.
            Err(_) => {
                self.finished = true;
                Some(Err(self.join_worker().err().unwrap_or_else(|| {
                    Error::Producer("worker exited without signalling completion".into())
                })))
            }
        }
    }
}

impl<T> Drop for MinibatchStreamer<T> {
    fn drop(&mut self) {
        // Hang up first so a producer blocked on a full queue wakes and exits.
        drop(self.receiver.take());
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
