// Consecutive-failure tracking and recovery escalation.

/// Decides when the planner gets a "you are stuck" hint and when the engine
/// bypasses the planner with a forced BACK.
#[derive(Debug, Clone)]
pub struct LoopController {
    hint_threshold: u32,
    force_back_threshold: u32,
    failure_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    None,
    Hint,
    ForceBack,
}

impl LoopController {
    pub fn new(hint_threshold: u32, force_back_threshold: u32) -> Self {
        debug_assert!(hint_threshold < force_back_threshold);
        Self {
            hint_threshold,
            force_back_threshold,
            failure_count: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    pub fn reset(&mut self) {
        self.failure_count = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failure_count
    }

    pub fn recovery(&self) -> Recovery {
        if self.failure_count >= self.force_back_threshold {
            Recovery::ForceBack
        } else if self.failure_count >= self.hint_threshold {
            Recovery::Hint
        } else {
            Recovery::None
        }
    }

    pub fn stuck_hint(&self) -> String {
        format!(
            "[SYSTEM HINT] {} consecutive failures detected. You are likely stuck on a wrong screen. \
             Use BACK or HOME to navigate to a relevant screen. Do NOT click random elements.",
            self.failure_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_and_reset() {
        let mut ctrl = LoopController::new(3, 5);
        for _ in 0..2 {
            ctrl.record_failure();
        }
        assert_eq!(ctrl.recovery(), Recovery::None);
        ctrl.record_failure();
        assert_eq!(ctrl.recovery(), Recovery::Hint);
        assert!(ctrl.stuck_hint().contains("3 consecutive failures"));
        ctrl.record_failure();
        ctrl.record_failure();
        assert_eq!(ctrl.recovery(), Recovery::ForceBack);

        ctrl.reset();
        assert_eq!(ctrl.failures(), 0);
        assert_eq!(ctrl.recovery(), Recovery::None);
    }

    #[test]
    fn test_success_clears_streak() {
        let mut ctrl = LoopController::new(3, 5);
        ctrl.record_failure();
        ctrl.record_failure();
        ctrl.record_success();
        ctrl.record_failure();
        assert_eq!(ctrl.failures(), 1);
        assert_eq!(ctrl.recovery(), Recovery::None);
    }
}
