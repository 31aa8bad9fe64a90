//! Score ledger: pure mappings from reputation score to account standing.
//!
//! Scores live in [0,100]. Penalties and recovery clamp into that range;
//! `status_for_score` alone decides whether a score change also moves the
//! account between tiers. Callers persist score and status together.

use crate::domain::user::AccountStatus;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Scores at or below this are banned.
pub const BAN_THRESHOLD: i32 = 15;
/// Scores above the ban threshold and at or below this are suspended.
pub const SUSPEND_THRESHOLD: i32 = 30;

/// Days of clean active time per recovered point.
pub const RECOVERY_INTERVAL_DAYS: i64 = 7;

/// Map a score to the account tier it mandates.
///
/// The 31-50 band is described as a "warning" zone in user-facing copy but
/// is not a distinct tier. It maps to `Active`.
pub fn status_for_score(score: i32) -> AccountStatus {
    if score <= BAN_THRESHOLD {
        AccountStatus::Banned
    } else if score <= SUSPEND_THRESHOLD {
        AccountStatus::Suspended
    } else {
        AccountStatus::Active
    }
}

/// Subtract a penalty, clamped to [0,100]. Total for any input.
pub fn deduct(score: i32, amount: i32) -> i32 {
    (score - amount).clamp(MIN_SCORE, MAX_SCORE)
}

/// Add recovered points, capped at 100. Total for any input.
pub fn restore(score: i32, points: i32) -> i32 {
    (score + points).clamp(MIN_SCORE, MAX_SCORE)
}

/// Points earned for a stretch of clean active days: one per full
/// seven-day interval since the user row last changed.
pub fn recovery_points(days_since_update: i64) -> i32 {
    if days_since_update <= 0 {
        return 0;
    }
    (days_since_update / RECOVERY_INTERVAL_DAYS) as i32
}

/// Admin-selected penalty severity. Levels map to fixed deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyLevel {
    Minor,
    Moderate,
    Severe,
}

impl PenaltyLevel {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Minor),
            2 => Some(Self::Moderate),
            3 => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn points(&self) -> i32 {
        match self {
            Self::Minor => 10,
            Self::Moderate => 15,
            Self::Severe => 25,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Severe => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_breakpoints_are_exact() {
        assert_eq!(status_for_score(0), AccountStatus::Banned);
        assert_eq!(status_for_score(15), AccountStatus::Banned);
        assert_eq!(status_for_score(16), AccountStatus::Suspended);
        assert_eq!(status_for_score(30), AccountStatus::Suspended);
        assert_eq!(status_for_score(31), AccountStatus::Active);
        assert_eq!(status_for_score(100), AccountStatus::Active);
    }

    #[test]
    fn tier_is_monotonic_in_score() {
        fn rank(status: AccountStatus) -> u8 {
            match status {
                AccountStatus::Banned => 0,
                AccountStatus::Suspended => 1,
                AccountStatus::Active => 2,
            }
        }
        for score in MIN_SCORE..MAX_SCORE {
            assert!(
                rank(status_for_score(score)) <= rank(status_for_score(score + 1)),
                "tier regressed between {} and {}",
                score,
                score + 1
            );
        }
    }

    #[test]
    fn deduct_clamps_at_zero() {
        assert_eq!(deduct(100, 25), 75);
        assert_eq!(deduct(10, 25), 0);
        assert_eq!(deduct(0, 10), 0);
        assert_eq!(deduct(25, 0), 25);
    }

    #[test]
    fn restore_caps_at_max() {
        assert_eq!(restore(90, 5), 95);
        assert_eq!(restore(99, 5), 100);
        assert_eq!(restore(100, 1), 100);
        assert_eq!(restore(0, 0), 0);
    }

    #[test]
    fn penalty_levels_map_to_fixed_deductions() {
        assert_eq!(PenaltyLevel::from_level(1), Some(PenaltyLevel::Minor));
        assert_eq!(PenaltyLevel::Minor.points(), 10);
        assert_eq!(PenaltyLevel::Moderate.points(), 15);
        assert_eq!(PenaltyLevel::Severe.points(), 25);
        assert_eq!(PenaltyLevel::from_level(0), None);
        assert_eq!(PenaltyLevel::from_level(4), None);
    }

    #[test]
    fn recovery_needs_a_full_interval() {
        assert_eq!(recovery_points(0), 0);
        assert_eq!(recovery_points(6), 0);
        assert_eq!(recovery_points(7), 1);
        assert_eq!(recovery_points(13), 1);
        assert_eq!(recovery_points(15), 2);
        assert_eq!(recovery_points(70), 10);
        assert_eq!(recovery_points(-3), 0);
    }

    #[test]
    fn repeated_severe_penalties_walk_into_suspension() {
        let mut score = 100;
        let mut seen = Vec::new();
        for _ in 0..3 {
            score = deduct(score, PenaltyLevel::Severe.points());
            seen.push((score, status_for_score(score)));
        }
        assert_eq!(
            seen,
            vec![
                (75, AccountStatus::Active),
                (50, AccountStatus::Active),
                (25, AccountStatus::Suspended),
            ]
        );
    }

    #[test]
    fn minor_penalty_can_tip_suspended_into_banned() {
        let score = deduct(20, PenaltyLevel::Minor.points());
        assert_eq!(score, 10);
        assert_eq!(status_for_score(score), AccountStatus::Banned);
    }
}
