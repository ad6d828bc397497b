// ABOUTME: Debounced scan scheduling as a cancellable timer task
// ABOUTME: Rescheduling replaces the pending timer so bursts coalesce into one scan

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scheduled,
    Running,
}

/// Sends a ticket on `due` when the debounce window elapses. Only the most
/// recently issued ticket is honoured by `take_due`.
pub struct ScanScheduler {
    state: ScanState,
    timer: Option<JoinHandle<()>>,
    ticket: u64,
    due: UnboundedSender<u64>,
}

impl ScanScheduler {
    pub fn new(due: UnboundedSender<u64>) -> Self {
        Self {
            state: ScanState::Idle,
            timer: None,
            ticket: 0,
            due,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn schedule(&mut self, delay: Duration) {
        self.cancel_timer();
        self.ticket += 1;

        let ticket = self.ticket;
        let due = self.due.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = due.send(ticket);
        }));

        self.state = ScanState::Scheduled;
        log::trace!("Scan scheduled in {:?} (ticket {})", delay, ticket);
    }

    /// True if `ticket` is the latest one and a scan is actually pending.
    pub fn take_due(&mut self, ticket: u64) -> bool {
        if ticket != self.ticket || self.state != ScanState::Scheduled {
            return false;
        }
        self.timer = None;
        true
    }

    pub fn mark_running(&mut self) {
        self.cancel_timer();
        self.state = ScanState::Running;
    }

    /// Ends a scan. A scan scheduled while running stays scheduled.
    pub fn mark_idle(&mut self) {
        if self.state == ScanState::Running {
            self.state = ScanState::Idle;
        }
    }

    pub fn cancel(&mut self) {
        self.cancel_timer();
        self.state = ScanState::Idle;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_ticket() {
        let (tx, mut rx) = unbounded_channel();
        let mut scheduler = ScanScheduler::new(tx);

        scheduler.schedule(Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.schedule(Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.schedule(Duration::from_millis(500));
        assert_eq!(scheduler.state(), ScanState::Scheduled);

        let ticket = rx.recv().await.unwrap();
        assert_eq!(ticket, 3);
        assert!(scheduler.take_due(ticket));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_is_ignored() {
        let (tx, mut rx) = unbounded_channel();
        let mut scheduler = ScanScheduler::new(tx);

        scheduler.schedule(Duration::from_millis(50));
        let first = rx.recv().await.unwrap();
        // Rescheduled after the timer fired but before the ticket was handled
        scheduler.schedule(Duration::from_millis(50));

        assert!(!scheduler.take_due(first));
        let second = rx.recv().await.unwrap();
        assert!(scheduler.take_due(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let (tx, _rx) = unbounded_channel();
        let mut scheduler = ScanScheduler::new(tx);
        assert_eq!(scheduler.state(), ScanState::Idle);

        scheduler.schedule(Duration::from_millis(10));
        assert_eq!(scheduler.state(), ScanState::Scheduled);

        scheduler.mark_running();
        assert_eq!(scheduler.state(), ScanState::Running);

        scheduler.mark_idle();
        assert_eq!(scheduler.state(), ScanState::Idle);

        scheduler.schedule(Duration::from_millis(10));
        scheduler.cancel();
        assert_eq!(scheduler.state(), ScanState::Idle);
    }
}
