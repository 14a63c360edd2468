//! Command execution against a [`ReportRepository`].

use std::future::Future;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::config::Command;
use crate::context::RequestContext;
use crate::model::Report;
use crate::query::{Keyword, Query};
use crate::repository::ReportRepository;

/// Run one command and return what should be printed on stdout.
pub fn execute(repo: &ReportRepository, ctx: &RequestContext, command: &Command) -> Result<String> {
    match command {
        Command::Create {
            digest,
            registration_uuid,
            mime_type,
            data,
        } => {
            let mut report = Report::new(digest, registration_uuid, mime_type);
            report.report = data.clone();
            let uuid = repo
                .create(ctx, &mut report)
                .context("Failed to create report")?;
            Ok(uuid)
        }
        Command::Get {
            digest,
            registration_uuid,
            mime_types,
        } => {
            let reports = repo
                .get_by(ctx, digest, registration_uuid.as_deref(), mime_types)
                .with_context(|| format!("Failed to get reports for {}", digest))?;
            to_json(&reports)
        }
        Command::Update { uuid, data } => {
            repo.update_report_data(ctx, uuid, data)
                .with_context(|| format!("Failed to update report {}", uuid))?;
            Ok(format!("updated {}", uuid))
        }
        Command::Delete { uuid } => {
            repo.delete(ctx, uuid)
                .with_context(|| format!("Failed to delete report {}", uuid))?;
            Ok(format!("deleted {}", uuid))
        }
        Command::DeleteDigests { digests } => {
            repo.delete_by_digests(ctx, digests)
                .context("Failed to delete reports by digest")?;
            Ok(format!("deleted reports of {} digest(s)", digests.len()))
        }
        Command::List {
            digest,
            registration_uuid,
            mime_types,
            page,
            page_size,
        } => {
            let query = list_query(
                digest.as_deref(),
                registration_uuid.as_deref(),
                mime_types,
                *page,
                *page_size,
            );
            let reports = repo.list(ctx, &query).context("Failed to list reports")?;
            to_json(&reports)
        }
        Command::Version => bail!("version is handled before the repository is opened"),
    }
}

/// How a command run ended
#[derive(Debug)]
pub enum Outcome {
    Finished(Result<String>),
    /// Shutdown was requested; holds the result the command reached after cancellation
    Interrupted(Result<String>),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Finished(Ok(_)) => 0,
            Outcome::Finished(Err(_)) => 1,
            Outcome::Interrupted(_) => 130,
        }
    }
}

/// Run `command` on a blocking thread until it finishes or `shutdown` resolves.
///
/// On shutdown the context is cancelled and the command is still awaited, so
/// the caller learns how far it got before the remaining store calls failed.
pub async fn run<F: Future>(
    repo: ReportRepository,
    ctx: RequestContext,
    command: Command,
    shutdown: F,
) -> Result<Outcome> {
    let task_ctx = ctx.clone();
    let mut task = tokio::task::spawn_blocking(move || execute(&repo, &task_ctx, &command));

    let finished = tokio::select! {
        biased;
        _ = shutdown => None,
        joined = &mut task => Some(joined),
    };

    match finished {
        Some(joined) => Ok(Outcome::Finished(joined.context("Command task failed")?)),
        None => {
            warn!("Received shutdown signal, cancelling request");
            ctx.cancel();
            let result = task.await.context("Command task failed")?;
            Ok(Outcome::Interrupted(result))
        }
    }
}

fn list_query(
    digest: Option<&str>,
    registration_uuid: Option<&str>,
    mime_types: &[String],
    page: u64,
    page_size: u64,
) -> Query {
    let mut query = Query::new().page(page, page_size);
    if let Some(digest) = digest {
        query = query.keyword("digest", Keyword::Exact(digest.to_string()));
    }
    if let Some(registration) = registration_uuid {
        query = query.keyword("registration_uuid", Keyword::Exact(registration.to_string()));
    }
    if !mime_types.is_empty() {
        query = query.keyword("mime_type", Keyword::OneOf(mime_types.to_vec()));
    }
    query
}

fn to_json(reports: &[Report]) -> Result<String> {
    serde_json::to_string_pretty(reports).context("Failed to serialize reports")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn repository() -> ReportRepository {
        let store = Arc::new(MemoryStore::new());
        ReportRepository::new(store.clone(), store)
    }

    fn create(repo: &ReportRepository, ctx: &RequestContext, digest: &str) -> String {
        execute(
            repo,
            ctx,
            &Command::Create {
                digest: digest.to_string(),
                registration_uuid: "r1".to_string(),
                mime_type: "application/vnd.scanner".to_string(),
                data: String::new(),
            },
        )
        .expect("Failed to create")
    }

    #[test]
    fn test_create_then_get() {
        let repo = repository();
        let ctx = RequestContext::background();
        let uuid = create(&repo, &ctx, "sha256:abc");

        let output = execute(
            &repo,
            &ctx,
            &Command::Get {
                digest: "sha256:abc".to_string(),
                registration_uuid: None,
                mime_types: vec![],
            },
        )
        .expect("Failed to get");

        let reports: Vec<Report> = serde_json::from_str(&output).expect("Invalid JSON output");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].uuid, uuid);
    }

    #[test]
    fn test_delete_missing_report_fails_with_context() {
        let repo = repository();
        let err = execute(
            &repo,
            &RequestContext::background(),
            &Command::Delete {
                uuid: "missing".to_string(),
            },
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Failed to delete report missing");
        assert!(format!("{:#}", err).contains("no report with uuid missing deleted"));
    }

    #[test]
    fn test_list_paged() {
        let repo = repository();
        let ctx = RequestContext::background();
        for digest in ["sha256:a", "sha256:b", "sha256:c"] {
            create(&repo, &ctx, digest);
        }

        let output = execute(
            &repo,
            &ctx,
            &Command::List {
                digest: None,
                registration_uuid: Some("r1".to_string()),
                mime_types: vec![],
                page: 2,
                page_size: 2,
            },
        )
        .expect("Failed to list");

        let reports: Vec<Report> = serde_json::from_str(&output).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].digest, "sha256:c");
    }

    #[test]
    fn test_list_query_keywords() {
        let query = list_query(Some("sha256:a"), None, &["mime/a".to_string()], 0, 0);
        assert_eq!(query.keywords.len(), 2);
        assert!(query.page_window().is_none());
    }

    #[tokio::test]
    async fn test_run_finishes_without_shutdown() {
        let ctx = RequestContext::background();
        let command = Command::DeleteDigests {
            digests: vec!["sha256:abc".to_string()],
        };

        let outcome = run(repository(), ctx.clone(), command, std::future::pending::<()>())
            .await
            .expect("Failed to run command");
        assert!(matches!(outcome, Outcome::Finished(Ok(_))));
        assert_eq!(outcome.exit_code(), 0);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_failure_exits_non_zero() {
        let command = Command::Delete {
            uuid: "missing".to_string(),
        };

        let outcome = run(
            repository(),
            RequestContext::background(),
            command,
            std::future::pending::<()>(),
        )
        .await
        .expect("Failed to run command");
        assert!(matches!(outcome, Outcome::Finished(Err(_))));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_run_shutdown_cancels_and_waits_for_command() {
        let ctx = RequestContext::background();
        let command = Command::DeleteDigests {
            digests: vec!["sha256:abc".to_string()],
        };

        let outcome = run(repository(), ctx.clone(), command, std::future::ready(()))
            .await
            .expect("Failed to run command");
        assert!(matches!(outcome, Outcome::Interrupted(_)));
        assert_eq!(outcome.exit_code(), 130);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_interrupted_success_still_exits_non_zero() {
        assert_eq!(Outcome::Interrupted(Ok(String::new())).exit_code(), 130);
    }

    #[test]
    fn test_version_is_not_executed() {
        let repo = repository();
        assert!(execute(&repo, &RequestContext::background(), &Command::Version).is_err());
    }
}
