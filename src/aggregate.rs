// Recomputes the derived fields of a progress record from a course snapshot.
// Touches only completion_percentage and is_completed; attempts and scores
// are owned by the facade.

use crate::models::{CourseSnapshot, ProgressRecord};

pub fn recompute(snapshot: &CourseSnapshot, record: &mut ProgressRecord) {
    let total = snapshot.chapters.len() + snapshot.quizzes.len();
    if total == 0 {
        // a course with no chapters and no quizzes is never completable
        record.completion_percentage = 0;
        return;
    }

    let completed_chapters = snapshot
        .chapters
        .iter()
        .filter(|c| {
            record
                .chapter_status
                .get(&c.id)
                .is_some_and(|s| s.completed)
        })
        .count();
    let passed_quizzes = snapshot
        .quizzes
        .iter()
        .filter(|q| {
            record
                .quiz_status
                .get(&q.id)
                .is_some_and(|s| s.ever_passed)
        })
        .count();

    let done = completed_chapters + passed_quizzes;
    record.completion_percentage = ((100 * done) / total) as u8;
    if done == total {
        // sticky: once completed the record never regresses
        record.is_completed = true;
    }
}
