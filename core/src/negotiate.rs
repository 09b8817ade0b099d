//! First-success negotiation over an ordered list of candidates.
//!
//! Both the upstream prober (request shapes) and the reply extractor
//! (extraction rules) are instances of the same loop: try candidates in
//! order, stop at the first acceptable one, and keep enough failure context
//! to explain a total miss.

/// Verdict of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T, F> {
    /// Done; no further candidates are tried.
    Accept(T),
    /// This candidate failed; try the next one.
    Continue(F),
    /// This candidate failed in a way no other candidate can fix.
    Abort(F),
}

/// Every candidate failed (or one aborted). Failures are kept in attempt
/// order so callers can log the full history and report the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<F> {
    pub failures: Vec<F>,
    pub aborted: bool,
}

impl<F> Exhausted<F> {
    /// The failure of the final attempt, `None` only for an empty candidate list.
    pub fn last(&self) -> Option<&F> {
        self.failures.last()
    }

    pub fn attempts(&self) -> usize {
        self.failures.len()
    }
}

pub fn first_success<C, T, F>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: impl FnMut(C) -> Step<T, F>,
) -> Result<T, Exhausted<F>> {
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate) {
            Step::Accept(value) => return Ok(value),
            Step::Continue(failure) => failures.push(failure),
            Step::Abort(failure) => {
                failures.push(failure);
                return Err(Exhausted {
                    failures,
                    aborted: true,
                });
            }
        }
    }
    Err(Exhausted {
        failures,
        aborted: false,
    })
}

/// Async twin of [`first_success`]. Attempts run strictly one after another:
/// candidate `n + 1` is not started until candidate `n` has a verdict.
pub async fn first_success_async<C, T, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: impl FnMut(C) -> Fut,
) -> Result<T, Exhausted<F>>
where
    Fut: Future<Output = Step<T, F>>,
{
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate).await {
            Step::Accept(value) => return Ok(value),
            Step::Continue(failure) => failures.push(failure),
            Step::Abort(failure) => {
                failures.push(failure);
                return Err(Exhausted {
                    failures,
                    aborted: true,
                });
            }
        }
    }
    Err(Exhausted {
        failures,
        aborted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_accept() {
        let mut tried = Vec::new();
        let result = first_success([1, 2, 3, 4], |n| {
            tried.push(n);
            if n == 2 { Step::Accept(n * 10) } else { Step::Continue(n) }
        });
        assert_eq!(result, Ok(20));
        assert_eq!(tried, vec![1, 2]);
    }

    #[test]
    fn exhaustion_keeps_every_failure_in_order() {
        let result: Result<(), _> = first_success(["a", "b", "c"], |s| Step::Continue(s));
        let exhausted = result.expect_err("nothing accepted");
        assert_eq!(exhausted.failures, vec!["a", "b", "c"]);
        assert_eq!(exhausted.last(), Some(&"c"));
        assert!(!exhausted.aborted);
    }

    #[test]
    fn abort_skips_remaining_candidates() {
        let mut tried = 0;
        let result: Result<(), _> = first_success(0..5, |n| {
            tried += 1;
            if n == 1 { Step::Abort(n) } else { Step::Continue(n) }
        });
        let exhausted = result.expect_err("aborted");
        assert!(exhausted.aborted);
        assert_eq!(exhausted.attempts(), 2);
        assert_eq!(tried, 2);
    }

    #[test]
    fn empty_candidates_exhaust_without_failures() {
        let result: Result<(), Exhausted<()>> = first_success(Vec::<u8>::new(), |_| Step::Continue(()));
        let exhausted = result.expect_err("nothing to try");
        assert_eq!(exhausted.last(), None);
    }

    #[tokio::test]
    async fn async_variant_runs_sequentially_and_stops_on_accept() {
        let mut order = Vec::new();
        let result = first_success_async([1, 2, 3], |n| {
            order.push(n);
            async move {
                tokio::task::yield_now().await;
                if n == 2 { Step::Accept(n) } else { Step::Continue(n) }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(order, vec![1, 2]);
    }
}
