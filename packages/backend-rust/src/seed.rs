use chrono::Utc;
use masterly_algo::Difficulty;
use serde_json::json;

use crate::db::operations::{upsert_item, upsert_skill, ItemRow, SkillRow};
use crate::db::Database;

struct DemoItem {
    id: &'static str,
    question: &'static str,
    kind: &'static str,
    options: &'static [&'static str],
    answer: &'static str,
    difficulty: Difficulty,
}

struct DemoSkill {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    items: &'static [DemoItem],
}

const DEMO_SKILLS: &[DemoSkill] = &[
    DemoSkill {
        id: "js-fundamentals",
        name: "JavaScript Fundamentals",
        description: "Learn the basics of JavaScript programming",
        items: &[
            DemoItem {
                id: "js-1",
                question: "What is the result of 5 + \"5\" in JavaScript?",
                kind: "multiple_choice",
                options: &["10", "55", "Error", "NaN"],
                answer: "55",
                difficulty: Difficulty::Easy,
            },
            DemoItem {
                id: "js-2",
                question: "Which keyword is used to declare a variable in JavaScript?",
                kind: "multiple_choice",
                options: &["var", "let", "const", "All of the above"],
                answer: "All of the above",
                difficulty: Difficulty::Easy,
            },
            DemoItem {
                id: "js-3",
                question: "Is JavaScript case-sensitive?",
                kind: "true_false",
                options: &["True", "False"],
                answer: "True",
                difficulty: Difficulty::Easy,
            },
            DemoItem {
                id: "js-4",
                question: "What does \"typeof null\" return in JavaScript?",
                kind: "multiple_choice",
                options: &["null", "undefined", "object", "boolean"],
                answer: "object",
                difficulty: Difficulty::Medium,
            },
            DemoItem {
                id: "js-5",
                question: "Which method is used to add an element to the end of an array?",
                kind: "multiple_choice",
                options: &["push()", "pop()", "shift()", "unshift()"],
                answer: "push()",
                difficulty: Difficulty::Medium,
            },
        ],
    },
    DemoSkill {
        id: "react-components",
        name: "React Components",
        description: "Understanding React component lifecycle and patterns",
        items: &[
            DemoItem {
                id: "react-1",
                question: "What is JSX?",
                kind: "multiple_choice",
                options: &[
                    "JavaScript XML",
                    "Java Syntax Extension",
                    "JSON Extended",
                    "JavaScript Extension",
                ],
                answer: "JavaScript XML",
                difficulty: Difficulty::Easy,
            },
            DemoItem {
                id: "react-2",
                question: "Which hook is used for state management in functional components?",
                kind: "multiple_choice",
                options: &["useEffect", "useState", "useContext", "useReducer"],
                answer: "useState",
                difficulty: Difficulty::Medium,
            },
            DemoItem {
                id: "react-3",
                question: "React components must return a single parent element.",
                kind: "true_false",
                options: &["True", "False"],
                answer: "False",
                difficulty: Difficulty::Hard,
            },
        ],
    },
    DemoSkill {
        id: "css-flexbox",
        name: "CSS Flexbox",
        description: "Modern CSS layout techniques with Flexbox",
        items: &[
            DemoItem {
                id: "flex-1",
                question: "What does \"flex: 1\" mean in CSS Flexbox?",
                kind: "multiple_choice",
                options: &[
                    "Fixed width of 1px",
                    "Grow to fill available space",
                    "Minimum width of 1",
                    "Maximum of 1 item",
                ],
                answer: "Grow to fill available space",
                difficulty: Difficulty::Medium,
            },
            DemoItem {
                id: "flex-2",
                question: "Is \"display: flex\" applied to the container or items?",
                kind: "multiple_choice",
                options: &["Container", "Items", "Both", "Neither"],
                answer: "Container",
                difficulty: Difficulty::Easy,
            },
        ],
    },
];

/// Load the demo skills and their item pools. Safe to run on every start.
pub async fn seed_demo_data(db: &Database) -> Result<(), sqlx::Error> {
    let now_ms = Utc::now().timestamp_millis();
    let mut tx = db.pool().begin().await?;

    for skill in DEMO_SKILLS {
        upsert_skill(
            &mut *tx,
            &SkillRow {
                id: skill.id.to_string(),
                name: skill.name.to_string(),
                description: skill.description.to_string(),
                created_at: now_ms,
            },
        )
        .await?;

        for item in skill.items {
            upsert_item(
                &mut *tx,
                &ItemRow {
                    skill_id: skill.id.to_string(),
                    id: item.id.to_string(),
                    difficulty: item.difficulty,
                    correct_answer: item.answer.to_string(),
                    content: json!({
                        "question": item.question,
                        "type": item.kind,
                        "options": item.options,
                    }),
                },
            )
            .await?;
        }
    }

    tx.commit().await?;

    let item_count: usize = DEMO_SKILLS.iter().map(|s| s.items.len()).sum();
    tracing::info!(skills = DEMO_SKILLS.len(), items = item_count, "demo data seeded");
    Ok(())
}
