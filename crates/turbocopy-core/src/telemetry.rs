/// Progress sampling shared by the scan and copy phases.
///
/// Snapshots are advisory: the ticker never blocks on a full progress queue,
/// it drops the tick instead. Only the final snapshot is guaranteed to be
/// delivered, by evicting the oldest queued snapshot when necessary.
use crossbeam_channel::{select, tick, Receiver, Sender, TrySendError};
use std::time::Duration;

/// Sample `snapshot` every `interval` and offer it to `tx` without blocking,
/// until `stop` is signalled or disconnected.
pub(crate) fn run_ticker<T, F>(interval: Duration, stop: &Receiver<()>, tx: &Sender<T>, mut snapshot: F)
where
    F: FnMut() -> T,
{
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop) -> _ => return,
            recv(ticker) -> _ => {
                let _ = tx.try_send(snapshot());
            }
        }
    }
}

/// Queue `value` as the last progress snapshot, making room if needed.
///
/// `rx` is the engine's own handle on the progress queue; it is only used to
/// evict a stale snapshot when the consumer has fallen behind. Holding it
/// also keeps the queue connected, so the send cannot fail for that reason.
pub(crate) fn publish_final<T>(tx: &Sender<T>, rx: &Receiver<T>, value: T) {
    let mut value = value;
    loop {
        match tx.try_send(value) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => return,
            Err(TrySendError::Full(returned)) => {
                value = returned;
                // Consumer may race us and drain the slot first; either way retry.
                let _ = rx.try_recv();
            }
        }
    }
}

/// Items per second over `elapsed`, zero before any time has passed.
pub(crate) fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
