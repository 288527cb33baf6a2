//! A single-writer retransmission timer, shared across every supplicant
//! session. One background task owns a min-heap of deadlines and a
//! command channel; callers arm or cancel a session's timer without ever
//! touching the heap themselves, and fired deadlines are delivered over
//! an output channel the dispatcher's event loop selects on alongside
//! EAPOL and RADIUS traffic.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use dot1x_types::MacAddress;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

/// Identifies one session's retransmission timer: the port and the
/// supplicant behind it.
pub type TimerKey = (MacAddress, MacAddress);

enum Command {
    Arm { key: TimerKey, deadline: Instant },
    Cancel { key: TimerKey },
}

#[derive(PartialEq, Eq)]
struct HeapEntry {
    deadline: Instant,
    key: TimerKey,
    generation: u64,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Handle to the running timer worker.
#[derive(Clone)]
pub struct TimerScheduler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl TimerScheduler {
    /// Spawns the worker task. Every deadline that fires without being
    /// cancelled or superseded by a later `arm` for the same key is sent
    /// on `fired_tx`.
    #[must_use]
    pub fn spawn(fired_tx: mpsc::UnboundedSender<TimerKey>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(cmd_rx, fired_tx));
        Self { cmd_tx }
    }

    /// Arms (or re-arms) the timer for `key` to fire after `duration`.
    /// Re-arming implicitly cancels any previously scheduled deadline for
    /// the same key.
    pub fn arm(&self, key: TimerKey, duration: Duration) {
        let _ = self.cmd_tx.send(Command::Arm {
            key,
            deadline: Instant::now() + duration,
        });
    }

    /// Cancels the timer for `key`, if one is armed.
    pub fn cancel(&self, key: TimerKey) {
        let _ = self.cmd_tx.send(Command::Cancel { key });
    }
}

async fn run_worker(mut cmd_rx: mpsc::UnboundedReceiver<Command>, fired_tx: mpsc::UnboundedSender<TimerKey>) {
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    let mut generations: HashMap<TimerKey, u64> = HashMap::new();

    loop {
        let next_deadline = heap.peek().map(|Reverse(entry)| entry.deadline);

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Arm { key, deadline }) => {
                        let generation = generations.entry(key).or_insert(0);
                        *generation += 1;
                        heap.push(Reverse(HeapEntry { deadline, key, generation: *generation }));
                    }
                    Some(Command::Cancel { key }) => {
                        generations.remove(&key);
                    }
                    None => return,
                }
            }
            () = sleep_until_or_pending(next_deadline) => {
                while let Some(Reverse(entry)) = heap.peek() {
                    if entry.deadline > Instant::now() {
                        break;
                    }
                    let Reverse(entry) = heap.pop().unwrap();
                    if generations.get(&entry.key) == Some(&entry.generation) {
                        generations.remove(&entry.key);
                        trace!(key = ?entry.key, "timer fired");
                        if fired_tx.send(entry.key).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

async fn sleep_until_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, last])
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TimerScheduler::spawn(tx);
        let key = (mac(1), mac(2));
        scheduler.arm(key, Duration::from_millis(50));

        tokio::time::advance(Duration::from_millis(60)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, key);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TimerScheduler::spawn(tx);
        let key = (mac(1), mac(2));
        scheduler.arm(key, Duration::from_millis(50));
        scheduler.cancel(key);

        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_supersedes_the_previous_deadline() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TimerScheduler::spawn(tx);
        let key = (mac(1), mac(2));
        scheduler.arm(key, Duration::from_millis(10));
        scheduler.arm(key, Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "the first, superseded deadline must not fire");

        tokio::time::advance(Duration::from_millis(100)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, key);
    }
}
