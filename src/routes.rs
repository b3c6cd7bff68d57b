use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::models::*;

pub fn router(engine: Arc<Engine>) -> Router {
    let static_dir = std::env::var("DATA_DIR").unwrap_or("./data".into());
    Router::new()
        // progress operations
        .route("/api/progress/chapter", post(complete_chapter))
        .route("/api/progress/quiz", post(submit_quiz))
        .route("/api/progress/:learner_id/:course_id", get(get_progress))
        // static content (serves certificate artifacts)
        .nest_service("/content", ServeDir::new(static_dir))
        .with_state(engine)
}

async fn complete_chapter(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CompleteChapterReq>,
) -> Result<Json<ChapterProgressRes>, EngineError> {
    let res = engine
        .complete_chapter(&req.learner_id, &req.course_id, &req.chapter_id)
        .await?;
    Ok(Json(res))
}

async fn submit_quiz(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<SubmitQuizReq>,
) -> Result<Json<QuizSubmitRes>, EngineError> {
    let res = engine
        .submit_quiz(&req.learner_id, &req.course_id, &req.quiz_id, &req.answers)
        .await?;
    Ok(Json(res))
}

async fn get_progress(
    State(engine): State<Arc<Engine>>,
    Path((learner_id, course_id)): Path<(String, String)>,
) -> Result<Json<ProgressRecord>, EngineError> {
    let record = engine.progress(&learner_id, &course_id).await?;
    Ok(Json(record))
}
