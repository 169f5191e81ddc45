/// Static per-tick effect of working in one app category: signed attribute
/// deltas, a stamina drain and an experience gain. Not persisted anywhere,
/// so tuning it only changes scoring going forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityImpact {
    pub focus: i64,
    pub productivity: i64,
    pub creativity: i64,
    pub stamina_cost: i64,
    pub knowledge: i64,
    pub collaboration: i64,
    pub exp_gain: i64,
}

/// Impact for a normalized app category. Categories without an entry get a
/// minimal default: a sliver of productivity and experience, nothing else.
pub fn impact_for(category: &str) -> ActivityImpact {
    match category {
        "Code Editor" => ActivityImpact {
            focus: 8,
            productivity: 10,
            creativity: 6,
            stamina_cost: 3,
            knowledge: 3,
            collaboration: 0,
            exp_gain: 15,
        },
        "Terminal" => ActivityImpact {
            focus: 6,
            productivity: 8,
            creativity: 3,
            stamina_cost: 2,
            knowledge: 2,
            collaboration: 0,
            exp_gain: 10,
        },
        "Slack" => ActivityImpact {
            focus: -3,
            productivity: 3,
            creativity: 2,
            stamina_cost: 1,
            knowledge: 1,
            collaboration: 8,
            exp_gain: 5,
        },
        "Browser" => ActivityImpact {
            focus: 0,
            productivity: 5,
            creativity: 4,
            stamina_cost: 2,
            knowledge: 4,
            collaboration: 2,
            exp_gain: 8,
        },
        "Documentation" => ActivityImpact {
            focus: 5,
            productivity: 6,
            creativity: 2,
            stamina_cost: 2,
            knowledge: 8,
            collaboration: 0,
            exp_gain: 10,
        },
        "Design Tool" => ActivityImpact {
            focus: 7,
            productivity: 7,
            creativity: 10,
            stamina_cost: 3,
            knowledge: 2,
            collaboration: 2,
            exp_gain: 12,
        },
        "Email" => ActivityImpact {
            focus: -2,
            productivity: 4,
            creativity: 1,
            stamina_cost: 2,
            knowledge: 1,
            collaboration: 6,
            exp_gain: 5,
        },
        "Video Conference" => ActivityImpact {
            focus: -5,
            productivity: 3,
            creativity: 3,
            stamina_cost: 4,
            knowledge: 2,
            collaboration: 10,
            exp_gain: 8,
        },
        _ => ActivityImpact {
            focus: 0,
            productivity: 1,
            creativity: 0,
            stamina_cost: 1,
            knowledge: 0,
            collaboration: 0,
            exp_gain: 3,
        },
    }
}
