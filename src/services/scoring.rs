use crate::models::test_session::SnapshotQuestion;
use std::collections::HashMap;

pub struct ScoringService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeOutcome {
    pub correct_answers: i32,
    pub answered_questions: i32,
    pub score: i32,
}

impl ScoringService {
    /// Grades a response map against the snapshot the session was issued
    /// with. Unanswered questions count as incorrect; the denominator is
    /// always the assigned question count.
    pub fn grade(snapshot: &[SnapshotQuestion], responses: &HashMap<usize, usize>) -> GradeOutcome {
        let total = snapshot.len() as i32;
        let mut correct = 0;
        let mut answered = 0;

        for (idx, q) in snapshot.iter().enumerate() {
            let Some(&choice) = responses.get(&idx) else {
                continue;
            };
            answered += 1;
            if choice < q.options.len() && choice as i32 == q.correct_answer {
                correct += 1;
            }
        }

        GradeOutcome {
            correct_answers: correct,
            answered_questions: answered,
            score: Self::compute_score(correct, total),
        }
    }

    /// `round(correct · 100 / total)` as an integer percentage.
    pub fn compute_score(correct_answers: i32, total_questions: i32) -> i32 {
        if total_questions <= 0 {
            return 0;
        }
        ((correct_answers as f64 * 100.0) / total_questions as f64).round() as i32
    }
}
