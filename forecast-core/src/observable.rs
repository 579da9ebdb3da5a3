//! Observable state cells.
//!
//! A [`StateCell`] is the single writer of a value; any number of
//! [`Observable`] handles can read the current value or wait for the next
//! one. Both sides are thin wrappers over `tokio::sync::watch`, so readers
//! always see the most recent write and never a queue of stale ones.

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

/// Writable side of an observable value. Not `Clone`: whoever owns the cell
/// is the only writer.
#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T> StateCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the value and notify observers, even when nobody is subscribed.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Copy-on-write update: `f` derives the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.tx.send_modify(|current| {
            let next = f(current);
            *current = next;
        });
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn observe(&self) -> Observable<T> {
        Observable {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Default for StateCell<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Read-only handle on a [`StateCell`].
#[derive(Debug, Clone)]
pub struct Observable<T> {
    rx: watch::Receiver<T>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next write. Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `predicate`, checking the current value first.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&T) -> bool) -> Option<T> {
        self.rx.wait_for(predicate).await.ok().map(|value| value.clone())
    }

    /// Current value followed by every subsequent write.
    pub fn into_stream(self) -> BoxStream<'static, T> {
        watch_stream(self.rx)
    }
}

/// Turn a watch receiver into a stream of snapshots: the current value first,
/// then one item per observed change. Ends when the sender is dropped.
pub fn watch_stream<T>(rx: watch::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + Sync + 'static,
{
    stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let value = rx.borrow_and_update().clone();
        Some((value, (rx, false)))
    })
    .boxed()
}
