use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Expectation levels of the engineering handbook rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Foundation,
    Core,
    Peak,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Foundation => "foundation",
            Level::Core => "core",
            Level::Peak => "peak",
        }
    }
}

impl std::str::FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "foundation" => Ok(Level::Foundation),
            "core" => Ok(Level::Core),
            "peak" => Ok(Level::Peak),
            other => Err(anyhow::anyhow!("unknown rubric level: {other}")),
        }
    }
}

/// One expectation category of the rubric.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub expectation: &'static str,
}

const FOUNDATION: &[Category] = &[
    Category {
        id: "technical-execution",
        name: "Technical execution",
        expectation: "Ships correct, well-tested changes with guidance and picks up new parts of the codebase quickly.",
    },
    Category {
        id: "code-quality",
        name: "Code quality",
        expectation: "Writes readable code, responds to review feedback, and leaves touched code better than found.",
    },
    Category {
        id: "delivery",
        name: "Delivery",
        expectation: "Breaks work into reviewable pieces and completes scoped tasks predictably.",
    },
    Category {
        id: "collaboration",
        name: "Collaboration",
        expectation: "Communicates progress and blockers early and works effectively with the immediate team.",
    },
    Category {
        id: "learning-growth",
        name: "Learning and growth",
        expectation: "Seeks feedback, absorbs team practices, and grows scope over time.",
    },
];

const CORE: &[Category] = &[
    Category {
        id: "technical-leadership",
        name: "Technical leadership",
        expectation: "Owns medium-sized projects end to end and makes sound design decisions with limited oversight.",
    },
    Category {
        id: "system-design",
        name: "System design",
        expectation: "Designs components that hold up under changing requirements and explains the tradeoffs taken.",
    },
    Category {
        id: "delivery-impact",
        name: "Delivery impact",
        expectation: "Lands work that moves team goals, managing scope and sequencing across several workstreams.",
    },
    Category {
        id: "collaboration",
        name: "Collaboration",
        expectation: "Coordinates across functions, unblocks others, and raises the quality of team decisions.",
    },
    Category {
        id: "mentorship",
        name: "Mentorship",
        expectation: "Levels up less experienced engineers through review, pairing, and well-judged delegation.",
    },
    Category {
        id: "operational-excellence",
        name: "Operational excellence",
        expectation: "Keeps owned systems healthy: monitoring, incident follow-through, and pragmatic debt paydown.",
    },
];

const PEAK: &[Category] = &[
    Category {
        id: "org-impact",
        name: "Organizational impact",
        expectation: "Delivers outcomes that matter beyond one team and aligns groups on a shared direction.",
    },
    Category {
        id: "technical-strategy",
        name: "Technical strategy",
        expectation: "Sets multi-quarter technical direction and retires whole classes of problems.",
    },
    Category {
        id: "cross-team-leadership",
        name: "Cross-team leadership",
        expectation: "Leads initiatives spanning teams, resolving ambiguity and contention without escalation.",
    },
    Category {
        id: "innovation",
        name: "Innovation",
        expectation: "Introduces approaches that measurably change how the organization builds or operates software.",
    },
    Category {
        id: "talent-development",
        name: "Talent development",
        expectation: "Grows senior engineers and shapes hiring, review, and promotion quality.",
    },
];

pub fn categories_for(level: Level) -> &'static [Category] {
    match level {
        Level::Foundation => FOUNDATION,
        Level::Core => CORE,
        Level::Peak => PEAK,
    }
}

pub fn category_ids(level: Level) -> Vec<&'static str> {
    categories_for(level).iter().map(|c| c.id).collect()
}

pub fn is_valid_category(level: Level, id: &str) -> bool {
    categories_for(level).iter().any(|c| c.id == id)
}

/// The rubric block rendered into the category-mapping prompt.
pub fn rubric_text(level: Level) -> String {
    let mut out = format!("Expectations at the {} level:\n", level.as_str());
    for category in categories_for(level) {
        let _ = writeln!(out, "- {} ({}): {}", category.id, category.name, category.expectation);
    }
    out
}
