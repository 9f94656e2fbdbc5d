//! Step Queue - the timer table behind the choreography.
//!
//! A min-heap keyed by `(fire_at, seq)`. `seq` is strictly increasing, so
//! steps sharing a fire time dispatch in the order they were scheduled.

use rsvp_env::RunId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A step waiting for its fire time.
#[derive(Debug, Clone)]
pub struct ScheduledStep<S> {
    pub fire_at: Duration,
    pub seq: u64,
    pub run: RunId,
    pub step: S,
}

impl<S> PartialEq for ScheduledStep<S> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl<S> Eq for ScheduledStep<S> {}

impl<S> PartialOrd for ScheduledStep<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for ScheduledStep<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending one-shot steps, each tagged with the run that scheduled it.
#[derive(Debug, Clone)]
pub struct StepQueue<S> {
    heap: BinaryHeap<ScheduledStep<S>>,
    next_seq: u64,
}

impl<S> StepQueue<S> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
    
    /// Schedules `step` to fire at `fire_at`.
    pub fn schedule(&mut self, run: RunId, fire_at: Duration, step: S) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledStep { fire_at, seq, run, step });
    }
    
    /// Fire time of the earliest pending step.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.heap.peek().map(|s| s.fire_at)
    }
    
    /// Removes and returns the earliest step if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<ScheduledStep<S>> {
        if self.heap.peek()?.fire_at > now {
            return None;
        }
        self.heap.pop()
    }
    
    /// Cancels everything. Returns how many steps were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }
    
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<S> Default for StepQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }
    
    #[test]
    fn test_time_ordering() {
        let mut q = StepQueue::new();
        q.schedule(RunId(1), ms(30), "late");
        q.schedule(RunId(1), ms(10), "early");
        q.schedule(RunId(1), ms(20), "mid");
        
        assert_eq!(q.next_deadline(), Some(ms(10)));
        let order: Vec<_> = std::iter::from_fn(|| q.pop_due(ms(100))).map(|s| s.step).collect();
        assert_eq!(order, vec!["early", "mid", "late"]);
    }
    
    #[test]
    fn test_fifo_at_same_time() {
        let mut q = StepQueue::new();
        q.schedule(RunId(1), ms(10), "first");
        q.schedule(RunId(1), ms(10), "second");
        q.schedule(RunId(1), ms(10), "third");
        
        let order: Vec<_> = std::iter::from_fn(|| q.pop_due(ms(10))).map(|s| s.step).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }
    
    #[test]
    fn test_pop_due_respects_now() {
        let mut q = StepQueue::new();
        q.schedule(RunId(1), ms(50), ());
        
        assert!(q.pop_due(ms(49)).is_none());
        assert_eq!(q.len(), 1);
        assert!(q.pop_due(ms(50)).is_some());
        assert!(q.is_empty());
    }
    
    #[test]
    fn test_cancel_all() {
        let mut q = StepQueue::new();
        q.schedule(RunId(1), ms(1), ());
        q.schedule(RunId(2), ms(2), ());
        
        assert_eq!(q.cancel_all(), 2);
        assert!(q.next_deadline().is_none());
        assert_eq!(q.cancel_all(), 0);
    }
}
