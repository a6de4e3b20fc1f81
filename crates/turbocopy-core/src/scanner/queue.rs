/// Bounded queue of directories waiting to be listed, plus the pending-count
/// that detects when traversal has fully drained.
///
/// `pending` counts directories that have been discovered but not yet
/// completed, whether they sit in the channel, in a worker's local backlog,
/// or are being listed right now. It is seeded to 1 for the root before any
/// worker can observe the queue, so it can only reach zero once every
/// discovered directory has been completed.
///
/// Workers are both the producers and the only consumers of this queue, so a
/// blocking push into a full queue could stall the whole pool. `push`
/// therefore never blocks: on overflow it hands the directory back and the
/// worker keeps it in a local backlog.
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct DirQueue {
    tx: Sender<PathBuf>,
    rx: Receiver<PathBuf>,
    pending: AtomicUsize,
    /// Dropped when `pending` reaches zero, which wakes every blocked `pop`.
    drained_tx: Mutex<Option<Sender<()>>>,
    drained_rx: Receiver<()>,
}

impl DirQueue {
    /// Create a queue already holding `root`, with a pending-count of 1.
    pub(crate) fn seeded(root: PathBuf, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        let (drained_tx, drained_rx) = bounded(0);
        // Capacity is at least 1 and nothing else holds the queue yet.
        let _ = tx.try_send(root);
        Self {
            tx,
            rx,
            pending: AtomicUsize::new(1),
            drained_tx: Mutex::new(Some(drained_tx)),
            drained_rx,
        }
    }

    /// Register a newly discovered directory and try to enqueue it.
    ///
    /// Returns `Err(dir)` when the queue is full; the directory is still
    /// counted as pending and the caller must process and `complete` it.
    pub(crate) fn push(&self, dir: PathBuf) -> Result<(), PathBuf> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(dir) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dir)) | Err(TrySendError::Disconnected(dir)) => Err(dir),
        }
    }

    /// Block until a directory is available, or return `None` once the
    /// traversal has drained.
    pub(crate) fn pop(&self) -> Option<PathBuf> {
        // Fast path: avoid the select when work is already queued.
        if let Ok(dir) = self.rx.try_recv() {
            return Some(dir);
        }
        select! {
            recv(self.rx) -> dir => dir.ok(),
            recv(self.drained_rx) -> _ => None,
        }
    }

    /// Mark one pending directory as fully processed.
    pub(crate) fn complete(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained_tx.lock().take();
        }
    }

    /// Directories discovered but not yet completed.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn is_drained(&self) -> bool {
        self.drained_tx.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    #[test]
    fn root_is_available_immediately() {
        let queue = DirQueue::seeded(PathBuf::from("/root"), 4);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.pop(), Some(PathBuf::from("/root")));
    }

    #[test]
    fn completing_last_pending_drains_queue() {
        let queue = DirQueue::seeded(PathBuf::from("/root"), 4);
        let root = queue.pop().unwrap();
        assert_eq!(root, PathBuf::from("/root"));
        assert!(queue.push(PathBuf::from("/root/a")).is_ok());
        queue.complete();
        assert!(!queue.is_drained());

        assert_eq!(queue.pop(), Some(PathBuf::from("/root/a")));
        queue.complete();
        assert!(queue.is_drained());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn full_queue_hands_directory_back_but_counts_it() {
        let queue = DirQueue::seeded(PathBuf::from("/root"), 1);
        let overflow = queue.push(PathBuf::from("/root/a"));
        assert_eq!(overflow, Err(PathBuf::from("/root/a")));
        assert_eq!(queue.pending(), 2);
    }

    #[test]
    fn blocked_pop_wakes_when_drained() {
        let queue = DirQueue::seeded(PathBuf::from("/root"), 4);
        queue.pop().unwrap();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| queue.pop());
            std::thread::sleep(Duration::from_millis(20));
            queue.complete();
            assert_eq!(waiter.join().unwrap(), None);
        });
    }

    #[test]
    fn many_workers_drain_a_synthetic_tree() {
        // Each directory at depth < 4 "contains" three subdirectories.
        let queue = DirQueue::seeded(PathBuf::from("d"), 2);
        let visited = AtomicU64::new(0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while let Some(dir) = queue.pop() {
                        let mut backlog = vec![dir];
                        while let Some(dir) = backlog.pop() {
                            visited.fetch_add(1, Ordering::Relaxed);
                            if dir.components().count() < 4 {
                                for i in 0..3 {
                                    if let Err(child) = queue.push(dir.join(i.to_string())) {
                                        backlog.push(child);
                                    }
                                }
                            }
                            queue.complete();
                        }
                    }
                });
            }
        });

        // 1 + 3 + 9 + 27 directories.
        assert_eq!(visited.load(Ordering::Relaxed), 40);
        assert!(queue.is_drained());
    }
}
