// Certificate issuance. The decider runs inside the store's atomic update so
// that two racing calls can never both observe "no certificate yet" — the
// per-key serialization in the store is what makes issuance at-most-once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{Certificate, CourseSnapshot, ProgressRecord};

#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    // returns a durable artifact reference (URL or /content path)
    async fn render(
        &self,
        learner_name: &str,
        course_title: &str,
        issued_on: DateTime<Utc>,
    ) -> Result<String, EngineError>;
}

// If the record is newly complete and uncertified, render and attach a
// certificate. A rendering failure is logged and swallowed: the surrounding
// update still commits, and a later call retries since is_completed holds.
pub async fn maybe_issue(
    snapshot: &CourseSnapshot,
    record: &mut ProgressRecord,
    learner_name: &str,
    renderer: &dyn CertificateRenderer,
    now: DateTime<Utc>,
) -> Option<Certificate> {
    if record.certificate.is_some() || !record.is_completed {
        return None;
    }
    match renderer.render(learner_name, &snapshot.title, now).await {
        Ok(artifact_ref) => {
            let cert = Certificate {
                certificate_id: certificate_id(&record.learner_id, &record.course_id, now),
                issued_at: now,
                artifact_ref,
            };
            record.certificate = Some(cert.clone());
            Some(cert)
        }
        Err(e) => {
            tracing::warn!(
                learner=%record.learner_id,
                course=%record.course_id,
                error=%e,
                "certificate rendering failed; progress committed, issuance deferred"
            );
            None
        }
    }
}

fn certificate_id(learner_id: &str, course_id: &str, now: DateTime<Utc>) -> String {
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));
    format!("{learner_id}-{course_id}-{nanos}")
}

// Writes the certificate under DATA_DIR/certificates and hands back the
// /content path ServeDir exposes it at.
pub struct FileRenderer {
    base_dir: PathBuf,
}

impl FileRenderer {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

#[async_trait]
impl CertificateRenderer for FileRenderer {
    async fn render(
        &self,
        learner_name: &str,
        course_title: &str,
        issued_on: DateTime<Utc>,
    ) -> Result<String, EngineError> {
        let file_name = format!("{}.html", Uuid::new_v4());
        let dir = self.base_dir.join("certificates");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EngineError::Rendering(e.to_string()))?;

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset='utf-8'/><title>Certificate of Completion</title></head>
<body>
  <h1>Certificate of Completion</h1>
  <p>This certifies that <strong>{learner_name}</strong> has completed</p>
  <h2>{course_title}</h2>
  <p>on {date}</p>
</body>
</html>"#,
            learner_name = learner_name,
            course_title = course_title,
            date = issued_on.format("%Y-%m-%d"),
        );

        tokio::fs::write(dir.join(&file_name), html)
            .await
            .map_err(|e| EngineError::Rendering(e.to_string()))?;
        Ok(format!("/content/certificates/{file_name}"))
    }
}

#[derive(Serialize, Debug)]
struct RenderReq<'a> {
    learner_name: &'a str,
    course_title: &'a str,
    issued_on: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
struct RenderRes {
    artifact_ref: String,
}

// Delegates rendering to an external service; the shared client carries the
// upstream timeout, so a hung renderer surfaces as a Rendering error instead
// of stalling the update.
pub struct HttpRenderer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRenderer {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl CertificateRenderer for HttpRenderer {
    async fn render(
        &self,
        learner_name: &str,
        course_title: &str,
        issued_on: DateTime<Utc>,
    ) -> Result<String, EngineError> {
        let url = format!("{}/render", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&RenderReq {
                learner_name,
                course_title,
                issued_on,
            })
            .send()
            .await
            .map_err(|e| EngineError::Rendering(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::Rendering(e.to_string()))?;
        let body: RenderRes = res
            .json()
            .await
            .map_err(|e| EngineError::Rendering(e.to_string()))?;
        Ok(body.artifact_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChapterRef, CourseSnapshot};

    struct StaticRenderer;

    #[async_trait]
    impl CertificateRenderer for StaticRenderer {
        async fn render(
            &self,
            _learner_name: &str,
            _course_title: &str,
            _issued_on: DateTime<Utc>,
        ) -> Result<String, EngineError> {
            Ok("/content/certificates/test.html".into())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl CertificateRenderer for FailingRenderer {
        async fn render(
            &self,
            _learner_name: &str,
            _course_title: &str,
            _issued_on: DateTime<Utc>,
        ) -> Result<String, EngineError> {
            Err(EngineError::Rendering("renderer offline".into()))
        }
    }

    fn snapshot() -> CourseSnapshot {
        CourseSnapshot {
            id: "course-1".into(),
            title: "Course One".into(),
            chapters: vec![ChapterRef { id: "ch1".into() }],
            quizzes: vec![],
        }
    }

    fn completed_record() -> ProgressRecord {
        let mut record = ProgressRecord::new("l1", "course-1");
        record.completion_percentage = 100;
        record.is_completed = true;
        record
    }

    #[tokio::test]
    async fn issues_once_then_noops() {
        let snap = snapshot();
        let mut record = completed_record();
        let now = Utc::now();

        let issued = maybe_issue(&snap, &mut record, "Ada", &StaticRenderer, now).await;
        let cert = issued.expect("first eligible call issues");
        assert_eq!(cert.artifact_ref, "/content/certificates/test.html");
        assert!(cert.certificate_id.starts_with("l1-course-1-"));
        assert_eq!(record.certificate.as_ref().unwrap().certificate_id, cert.certificate_id);

        let again = maybe_issue(&snap, &mut record, "Ada", &StaticRenderer, Utc::now()).await;
        assert!(again.is_none());
        assert_eq!(
            record.certificate.as_ref().unwrap().certificate_id,
            cert.certificate_id
        );
    }

    #[tokio::test]
    async fn incomplete_record_is_left_alone() {
        let snap = snapshot();
        let mut record = ProgressRecord::new("l1", "course-1");
        let issued = maybe_issue(&snap, &mut record, "Ada", &StaticRenderer, Utc::now()).await;
        assert!(issued.is_none());
        assert!(record.certificate.is_none());
    }

    #[tokio::test]
    async fn render_failure_defers_issuance() {
        let snap = snapshot();
        let mut record = completed_record();
        let issued = maybe_issue(&snap, &mut record, "Ada", &FailingRenderer, Utc::now()).await;
        assert!(issued.is_none());
        assert!(record.certificate.is_none());
        assert!(record.is_completed);

        // renderer recovers, the next call issues
        let issued = maybe_issue(&snap, &mut record, "Ada", &StaticRenderer, Utc::now()).await;
        assert!(issued.is_some());
    }

    #[tokio::test]
    async fn file_renderer_writes_under_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(dir.path().to_path_buf());
        let artifact = renderer
            .render("Ada Lovelace", "Course One", Utc::now())
            .await
            .unwrap();
        assert!(artifact.starts_with("/content/certificates/"));
        let file_name = artifact.rsplit('/').next().unwrap();
        let written = std::fs::read_to_string(dir.path().join("certificates").join(file_name)).unwrap();
        assert!(written.contains("Ada Lovelace"));
        assert!(written.contains("Course One"));
    }
}
