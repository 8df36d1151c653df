// Ceiling policy and the two conditional routers
//
// Both ceilings are compared against the same iteration counter, which only
// the Producer stage advances.

use serde::{Deserialize, Serialize};

use crate::candidate::RunStatus;

/// Next stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Produce,
    Review,
    Verify,
    End,
}

/// Router decision: where to go, and whether a ceiling overrode the stage outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub next: Stage,
    pub forced: bool,
}

/// Per-edge iteration ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeilingPolicy {
    /// Past this iteration a rejected review is treated as approved
    pub critic: u32,
    /// Past this iteration a failed verification ends the run anyway
    pub verify: u32,
}

impl CeilingPolicy {
    pub fn new(critic: u32, verify: u32) -> Self {
        Self { critic, verify }
    }

    /// Whether the verify ceiling sits at or above the critic ceiling.
    ///
    /// Both ceilings read one shared counter. Below the critic ceiling, the
    /// verify ceiling ends runs on a failed verification while the reviewer is
    /// still allowed to reject, which no shipped pipeline does.
    pub fn is_consistent(&self) -> bool {
        self.verify >= self.critic
    }

    /// Router 1, after REVIEW
    pub fn after_review(&self, iteration: u32, status: RunStatus) -> Route {
        let approved = status == RunStatus::Approved;
        if iteration > self.critic {
            return Route {
                next: Stage::Verify,
                forced: !approved,
            };
        }
        Route {
            next: if approved { Stage::Verify } else { Stage::Produce },
            forced: false,
        }
    }

    /// Router 2, after VERIFY
    pub fn after_verify(&self, iteration: u32, status: RunStatus) -> Route {
        let passed = status == RunStatus::Passed;
        if iteration > self.verify {
            return Route {
                next: Stage::End,
                forced: !passed,
            };
        }
        Route {
            next: if passed { Stage::End } else { Stage::Produce },
            forced: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_routes_follow_status_under_ceiling() {
        let policy = CeilingPolicy::new(5, 10);
        assert_eq!(policy.after_review(1, RunStatus::Approved).next, Stage::Verify);
        assert_eq!(policy.after_review(5, RunStatus::Rejected).next, Stage::Produce);
    }

    #[test]
    fn test_review_ceiling_forces_approval() {
        let policy = CeilingPolicy::new(5, 10);
        let route = policy.after_review(6, RunStatus::Rejected);
        assert_eq!(route, Route { next: Stage::Verify, forced: true });
        // Genuine approval past the ceiling is not "forced"
        assert!(!policy.after_review(6, RunStatus::Approved).forced);
    }

    #[test]
    fn test_verify_routes_follow_status_under_ceiling() {
        let policy = CeilingPolicy::new(5, 8);
        assert_eq!(policy.after_verify(3, RunStatus::Passed).next, Stage::End);
        assert_eq!(policy.after_verify(8, RunStatus::Failed).next, Stage::Produce);
    }

    #[test]
    fn test_verify_ceiling_forces_pass() {
        let policy = CeilingPolicy::new(5, 8);
        assert_eq!(
            policy.after_verify(9, RunStatus::Failed),
            Route { next: Stage::End, forced: true }
        );
    }

    #[test]
    fn test_is_consistent() {
        assert!(CeilingPolicy::new(5, 10).is_consistent());
        assert!(CeilingPolicy::new(5, 5).is_consistent());
        assert!(!CeilingPolicy::new(5, 3).is_consistent());
    }
}
