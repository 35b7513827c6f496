//! Bounded ready-signal handshake.
//!
//! A context cannot know whether its peer loaded before or after it, so it
//! repeats its ready signal on a short, fixed schedule and stops as soon as
//! the peer answers, or when the schedule runs out. There is no open-ended
//! polling.

use std::time::Duration;

use tokio::sync::watch;

/// Delays between ready signals, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSchedule {
    delays: Vec<Duration>,
}

impl HandshakeSchedule {
    /// Create a schedule from explicit delays.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Create a schedule from millisecond delays.
    pub fn from_millis(delays: &[u64]) -> Self {
        Self::new(delays.iter().copied().map(Duration::from_millis).collect())
    }

    /// Delay before the given attempt (0-indexed), if that attempt exists.
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }

    /// Number of ready signals the schedule sends.
    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Time from start until the last signal.
    pub fn total(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for HandshakeSchedule {
    fn default() -> Self {
        Self::from_millis(&[100, 500, 1000, 2000])
    }
}

/// How a handshake run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The peer answered after this many signals were sent.
    PeerReady { sent: usize },
    /// Every scheduled signal was sent without an answer.
    Exhausted { sent: usize },
    /// The context was torn down.
    Cancelled { sent: usize },
}

/// Run the handshake.
///
/// Sleeps through the schedule, calling `send_ready` with the attempt
/// number after each delay. Stops early once `peer_ready` turns `true`, or
/// when its sender is dropped (context teardown).
pub async fn run_handshake<F>(
    schedule: &HandshakeSchedule,
    mut peer_ready: watch::Receiver<bool>,
    mut send_ready: F,
) -> HandshakeOutcome
where
    F: FnMut(usize),
{
    let mut sent = 0;

    for attempt in 0..schedule.attempts() {
        if *peer_ready.borrow() {
            return HandshakeOutcome::PeerReady { sent };
        }

        let Some(delay) = schedule.delay_for_attempt(attempt) else {
            break;
        };
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => break,
                changed = peer_ready.changed() => {
                    if changed.is_err() {
                        tracing::debug!(sent, "handshake cancelled");
                        return HandshakeOutcome::Cancelled { sent };
                    }
                    if *peer_ready.borrow() {
                        return HandshakeOutcome::PeerReady { sent };
                    }
                }
            }
        }

        tracing::debug!(attempt, "sending ready signal");
        send_ready(attempt);
        sent += 1;
    }

    if *peer_ready.borrow() {
        HandshakeOutcome::PeerReady { sent }
    } else {
        tracing::debug!(sent, "handshake exhausted without a peer");
        HandshakeOutcome::Exhausted { sent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = HandshakeSchedule::default();
        assert_eq!(schedule.attempts(), 4);
        assert_eq!(schedule.delay_for_attempt(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_attempt(3), Some(Duration::from_secs(2)));
        assert_eq!(schedule.delay_for_attempt(4), None);
        assert_eq!(schedule.total(), Duration::from_millis(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_schedule_without_peer() {
        let (_tx, rx) = watch::channel(false);
        let mut attempts = Vec::new();

        let outcome = run_handshake(&HandshakeSchedule::default(), rx, |a| attempts.push(a)).await;

        assert_eq!(outcome, HandshakeOutcome::Exhausted { sent: 4 });
        assert_eq!(attempts, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_peer_ready() {
        let (tx, rx) = watch::channel(false);
        let schedule = HandshakeSchedule::default();

        let handle = tokio::spawn(async move {
            let mut sent = 0;
            let outcome = run_handshake(&schedule, rx, |_| sent += 1).await;
            (outcome, sent)
        });

        // first two signals go out at 100ms and 600ms
        tokio::time::sleep(Duration::from_millis(700)).await;
        tx.send(true).unwrap();

        let (outcome, sent) = handle.await.unwrap();
        assert_eq!(outcome, HandshakeOutcome::PeerReady { sent: 2 });
        assert_eq!(sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_ready_sends_nothing() {
        let (_tx, rx) = watch::channel(true);
        let outcome = run_handshake(&HandshakeSchedule::default(), rx, |_| {}).await;
        assert_eq!(outcome, HandshakeOutcome::PeerReady { sent: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            run_handshake(&HandshakeSchedule::default(), rx, |_| {}).await
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(tx);

        assert_eq!(handle.await.unwrap(), HandshakeOutcome::Cancelled { sent: 1 });
    }
}
