//! Practice recommendations derived from per-skill mastery.

use serde::{Deserialize, Serialize};

use crate::types::MasteryLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub skill_id: String,
    pub mastery: f64,
    pub level: MasteryLevel,
    pub priority: Priority,
    pub advice: &'static str,
}

fn classify(mastery: f64) -> (Priority, &'static str) {
    if mastery < 0.3 {
        (Priority::High, "Focus on building fundamental understanding")
    } else if mastery < 0.6 {
        (Priority::Medium, "Continue practicing to strengthen skills")
    } else if mastery < 0.8 {
        (Priority::Medium, "Work on advanced problems to achieve mastery")
    } else {
        (Priority::Low, "Maintain skills with periodic review")
    }
}

/// Highest priority first; within a priority, weakest skill first.
pub fn recommend<'a, I>(skills: I) -> Vec<Recommendation>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut recommendations: Vec<Recommendation> = skills
        .into_iter()
        .map(|(skill_id, mastery)| {
            let (priority, advice) = classify(mastery);
            Recommendation {
                skill_id: skill_id.to_string(),
                mastery,
                level: MasteryLevel::from_mastery(mastery),
                priority,
                advice,
            }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.mastery.total_cmp(&b.mastery))
    });
    recommendations
}
