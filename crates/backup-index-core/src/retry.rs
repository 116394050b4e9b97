/// What happens to a resource after a failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back in the queue, eligible for the next drain.
    Requeue,
    /// Retry ceiling reached; out of the queue until a rescan sees a change.
    Stall,
}

/// `times_failed` is the count including the failure being reported.
///
/// There is no backoff here; a requeued resource is picked up by the next drain and any
/// delay is up to the caller.
pub fn will_requeue(times_failed: u32, max_retries: u32) -> bool {
    times_failed < max_retries
}

pub fn decide(times_failed: u32, max_retries: u32) -> RetryDecision {
    if will_requeue(times_failed, max_retries) {
        RetryDecision::Requeue
    } else {
        RetryDecision::Stall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_below_ceiling() {
        assert!(will_requeue(1, 3));
        assert!(will_requeue(2, 3));
        assert_eq!(decide(2, 3), RetryDecision::Requeue);
    }

    #[test]
    fn test_stall_at_and_past_ceiling() {
        assert!(!will_requeue(3, 3));
        assert!(!will_requeue(4, 3));
        assert_eq!(decide(3, 3), RetryDecision::Stall);
    }

    #[test]
    fn test_single_attempt_ceiling() {
        assert_eq!(decide(1, 1), RetryDecision::Stall);
    }
}
