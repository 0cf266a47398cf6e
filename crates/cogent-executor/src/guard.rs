/// Verdict for the next workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    Continue,
    /// Past the nominal limit, still inside the safety margin. The
    /// margin absorbs graceful wind-down; a hard cutoff at the nominal
    /// limit would kill workflows one step from finishing.
    Warn { completed: usize, limit: usize },
    Abort { completed: usize, hard_limit: usize },
}

/// Mutable per-run iteration bookkeeping. Owned by exactly one engine
/// run, destroyed with it.
#[derive(Debug, Default)]
pub struct IterationState {
    pub completed: usize,
    warned: bool,
}

impl IterationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed step.
    pub fn record(&mut self) {
        self.completed += 1;
    }
}

/// Pure counter/limit checker. No side effects beyond latching the
/// one-shot warn in `IterationState`.
#[derive(Debug, Clone, Copy)]
pub struct IterationGuard {
    max_iterations: usize,
    safety_margin: usize,
}

impl IterationGuard {
    pub fn new(max_iterations: usize, safety_margin: usize) -> Self {
        Self {
            max_iterations,
            safety_margin,
        }
    }

    pub fn hard_limit(&self) -> usize {
        self.max_iterations.saturating_mul(self.safety_margin)
    }

    /// Check before starting the next step. `Warn` fires at most once
    /// per run.
    pub fn check(&self, state: &mut IterationState) -> GuardVerdict {
        if state.completed >= self.hard_limit() {
            GuardVerdict::Abort {
                completed: state.completed,
                hard_limit: self.hard_limit(),
            }
        } else if state.completed >= self.max_iterations {
            if state.warned {
                GuardVerdict::Continue
            } else {
                state.warned = true;
                GuardVerdict::Warn {
                    completed: state.completed,
                    limit: self.max_iterations,
                }
            }
        } else {
            GuardVerdict::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continues_below_nominal_limit() {
        let guard = IterationGuard::new(5, 2);
        let mut state = IterationState::new();
        for _ in 0..5 {
            assert_eq!(guard.check(&mut state), GuardVerdict::Continue);
            state.record();
        }
    }

    #[test]
    fn warns_once_inside_margin() {
        let guard = IterationGuard::new(3, 2);
        let mut state = IterationState::new();
        for _ in 0..3 {
            assert_eq!(guard.check(&mut state), GuardVerdict::Continue);
            state.record();
        }
        assert_eq!(
            guard.check(&mut state),
            GuardVerdict::Warn {
                completed: 3,
                limit: 3
            }
        );
        state.record();
        // Still in the margin, but the warn is latched
        assert_eq!(guard.check(&mut state), GuardVerdict::Continue);
    }

    #[test]
    fn aborts_at_hard_limit_never_before_nominal() {
        let guard = IterationGuard::new(5, 2);
        let mut state = IterationState::new();
        let mut steps = 0;
        loop {
            match guard.check(&mut state) {
                GuardVerdict::Abort {
                    completed,
                    hard_limit,
                } => {
                    assert_eq!(completed, 10);
                    assert_eq!(hard_limit, 10);
                    break;
                }
                _ => {
                    state.record();
                    steps += 1;
                    assert!(steps <= 10, "ran past the hard limit");
                }
            }
        }
        assert!(steps >= 5, "aborted before the nominal limit");
        assert_eq!(steps, 10);
    }

    #[test]
    fn margin_of_one_aborts_at_nominal() {
        let guard = IterationGuard::new(4, 1);
        let mut state = IterationState::new();
        for _ in 0..4 {
            assert_eq!(guard.check(&mut state), GuardVerdict::Continue);
            state.record();
        }
        assert!(matches!(
            guard.check(&mut state),
            GuardVerdict::Abort { completed: 4, .. }
        ));
    }
}
