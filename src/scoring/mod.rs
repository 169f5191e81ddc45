//! Pure gamification computations. Nothing in here performs I/O; the daemon
//! services feed these functions snapshots from the stores and persist the
//! results.

use crate::storage::entities::{AttributeModifier, UserStatus};

pub mod impact;

pub use impact::{impact_for, ActivityImpact};

/// Experience gates grow by repeated multiplication, truncating to an
/// integer after every step: 0, 100, 150, 225, 337, 505, 757, ...
const BASE_LEVEL_EXP: i64 = 100;
const LEVEL_GROWTH: f64 = 1.5;

/// Total experience required to reach `level`. Level 1 starts at zero. The
/// per-step truncation is deliberate: the emitted values are a wire contract,
/// so this must never be replaced by a closed-form power.
pub fn exp_threshold(level: i64) -> i64 {
    if level <= 1 {
        return 0;
    }
    let mut gate = BASE_LEVEL_EXP;
    for _ in 2..level {
        gate = (gate as f64 * LEVEL_GROWTH) as i64;
    }
    gate
}

/// Largest level whose threshold fits under `total_exp`. Unbounded above;
/// terminates because the curve is strictly increasing past level 2.
pub fn level_for_total_exp(total_exp: i64) -> i64 {
    let mut level = 1;
    while exp_threshold(level + 1) <= total_exp {
        level += 1;
    }
    level
}

/// Reported when applying activity pushed the user over a level gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUp {
    pub from: i64,
    pub to: i64,
}

fn clamp_attribute(value: i64) -> i64 {
    value.max(0)
}

/// Applies one observed activity to the status. Every five elapsed minutes
/// count as one tick; partial ticks round down but never below one. Stamina
/// is drained by its cost while the other attributes gain, all floored at
/// zero, and level/experience are recomputed from the new total.
pub fn apply_activity(
    status: &mut UserStatus,
    impact: &ActivityImpact,
    elapsed_minutes: i64,
) -> Option<LevelUp> {
    let multiplier = (elapsed_minutes / 5).max(1);

    status.focus = clamp_attribute(status.focus + impact.focus * multiplier);
    status.productivity = clamp_attribute(status.productivity + impact.productivity * multiplier);
    status.creativity = clamp_attribute(status.creativity + impact.creativity * multiplier);
    status.stamina = clamp_attribute(status.stamina - impact.stamina_cost * multiplier);
    status.knowledge = clamp_attribute(status.knowledge + impact.knowledge * multiplier);
    status.collaboration =
        clamp_attribute(status.collaboration + impact.collaboration * multiplier);

    status.total_exp += impact.exp_gain * multiplier;

    let previous = status.level;
    status.level = level_for_total_exp(status.total_exp);
    status.experience = status.total_exp - exp_threshold(status.level);

    (status.level > previous).then_some(LevelUp {
        from: previous,
        to: status.level,
    })
}

/// Read-time overlay of active modifiers onto a base status. The stored
/// record is never touched; modifier addition commutes, so iteration order
/// doesn't matter.
pub fn effective_status(base: &UserStatus, modifiers: &[AttributeModifier]) -> UserStatus {
    let mut status = base.clone();
    for modifier in modifiers {
        let slot = status.attribute_mut(modifier.attribute);
        *slot = clamp_attribute(*slot + modifier.value);
    }
    status
}

/// Adds `amount` to stamina (floored at zero), leaving everything else
/// untouched. Negative amounts are allowed and drain instead.
pub fn restore_stamina(status: &mut UserStatus, amount: i64) {
    status.stamina = clamp_attribute(status.stamina + amount);
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::storage::entities::{Attribute, AttributeModifier, UserStatus};

    use super::{
        apply_activity, effective_status, exp_threshold, impact_for, level_for_total_exp,
        restore_stamina, ActivityImpact, LevelUp,
    };

    fn seeded() -> UserStatus {
        UserStatus::seeded("local", Utc::now())
    }

    #[test]
    fn threshold_sequence_matches_compounded_truncation() {
        let expected = [0, 0, 100, 150, 225, 337, 505, 757, 1135, 1702];
        for (level, gate) in expected.into_iter().enumerate() {
            assert_eq!(exp_threshold(level as i64), gate, "level {level}");
        }
    }

    #[test]
    fn thresholds_strictly_increase_past_level_two() {
        for level in 2..60 {
            assert!(exp_threshold(level) < exp_threshold(level + 1), "level {level}");
        }
    }

    #[test]
    fn level_brackets_total_experience() {
        for total_exp in 0..5_000 {
            let level = level_for_total_exp(total_exp);
            assert!(exp_threshold(level) <= total_exp);
            assert!(total_exp < exp_threshold(level + 1));
        }
    }

    #[test]
    fn five_minutes_of_editing_grants_one_tick() {
        let mut status = seeded();
        let level_up = apply_activity(&mut status, &impact_for("Code Editor"), 5);

        assert_eq!(level_up, None);
        assert_eq!(status.total_exp, 15);
        assert_eq!(status.level, 1);
        assert_eq!(status.experience, 15);
        assert_eq!(status.focus, 58);
        assert_eq!(status.stamina, 97);
    }

    #[test]
    fn exactly_one_hundred_exp_reaches_level_two() {
        let mut status = seeded();
        let impact = ActivityImpact {
            exp_gain: 100,
            ..impact_for("unknown app")
        };
        let level_up = apply_activity(&mut status, &impact, 5);

        assert_eq!(level_up, Some(LevelUp { from: 1, to: 2 }));
        assert_eq!(status.total_exp, 100);
        assert_eq!(status.level, 2);
        assert_eq!(status.experience, 0);
    }

    #[test]
    fn twelve_minutes_rounds_down_to_two_ticks() {
        let mut status = seeded();
        apply_activity(&mut status, &impact_for("Terminal"), 12);
        assert_eq!(status.total_exp, 20);
        assert_eq!(status.focus, 62);
    }

    #[test]
    fn sub_tick_durations_still_count_once() {
        let mut status = seeded();
        apply_activity(&mut status, &impact_for("Terminal"), 2);
        assert_eq!(status.total_exp, 10);
    }

    #[test]
    fn attributes_never_go_negative() {
        let mut status = seeded();
        status.stamina = 1;
        let impact = ActivityImpact {
            stamina_cost: 50,
            ..impact_for("unknown app")
        };
        apply_activity(&mut status, &impact, 30);
        assert_eq!(status.stamina, 0);

        let modifier = AttributeModifier {
            id: 1,
            user_id: "local".into(),
            attribute: Attribute::Focus,
            value: -500,
            reason: "test".into(),
            expires_at: None,
            created_at: Utc::now(),
        };
        let effective = effective_status(&status, &[modifier]);
        assert_eq!(effective.focus, 0);
    }

    #[test]
    fn modifier_overlay_leaves_base_untouched() {
        let base = seeded();
        let now = Utc::now();
        let modifier = AttributeModifier {
            id: 1,
            user_id: "local".into(),
            attribute: Attribute::Focus,
            value: -10,
            reason: "distraction".into(),
            expires_at: Some(now + Duration::hours(1)),
            created_at: now,
        };

        let active: Vec<_> = [modifier.clone()]
            .into_iter()
            .filter(|m| m.is_active(now))
            .collect();
        assert_eq!(effective_status(&base, &active).focus, 40);
        assert_eq!(base.focus, 50);

        // Past its expiry the modifier no longer qualifies as active.
        let later = now + Duration::hours(2);
        let active: Vec<_> = [modifier].into_iter().filter(|m| m.is_active(later)).collect();
        assert_eq!(effective_status(&base, &active).focus, 50);
    }

    #[test]
    fn stamina_restore_is_isolated_and_floored() {
        let mut status = seeded();
        restore_stamina(&mut status, 20);
        assert_eq!(status.stamina, 120);
        assert_eq!(status.total_exp, 0);
        assert_eq!(status.focus, 50);

        restore_stamina(&mut status, -500);
        assert_eq!(status.stamina, 0);
    }
}
