//! Report row operations

use rusqlite::{ErrorCode, params, params_from_iter};
use tracing::debug;

use super::database::Database;
use crate::context::RequestContext;
use crate::error::StoreError;
use crate::model::{MutableField, Report, filter_column, sort_column};
use crate::query::{Keyword, Query, SortOrder};
use crate::store::ReportStore;

const REPORT_COLUMNS: &str =
    "uuid, digest, registration_uuid, mime_type, report, created_at, updated_at";

/// Render the query keywords as a WHERE clause with positional parameters.
pub(super) fn where_clause(query: &Query) -> Result<(String, Vec<String>), StoreError> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    for (key, keyword) in &query.keywords {
        let column = filter_column(key)?;
        match keyword {
            Keyword::Exact(value) => {
                conditions.push(format!("{} = ?", column));
                values.push(value.clone());
            }
            Keyword::OneOf(list) if list.is_empty() => conditions.push("0".to_string()),
            Keyword::OneOf(list) => {
                let placeholders = vec!["?"; list.len()].join(", ");
                conditions.push(format!("{} IN ({})", column, placeholders));
                values.extend(list.iter().cloned());
            }
            Keyword::Or(list) if list.is_empty() => conditions.push("0".to_string()),
            Keyword::Or(list) => {
                let alternatives = vec![format!("{} = ?", column); list.len()].join(" OR ");
                conditions.push(format!("({})", alternatives));
                values.extend(list.iter().cloned());
            }
            Keyword::Fuzzy(value) => {
                conditions.push(format!("{} LIKE ? ESCAPE '\\'", column));
                values.push(format!("%{}%", escape_like(value)));
            }
        }
    }

    if conditions.is_empty() {
        return Ok((String::new(), values));
    }
    Ok((format!(" WHERE {}", conditions.join(" AND ")), values))
}

/// Escape LIKE wildcards so the value matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_insert_error(err: rusqlite::Error, report: &Report) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Duplicate(format!(
                "uuid {} or digest {} registration {} mime type {}",
                report.uuid, report.digest, report.registration_uuid, report.mime_type
            ))
        }
        other => other.into(),
    }
}

impl ReportStore for Database {
    fn create(&self, ctx: &RequestContext, report: &Report) -> Result<Report, StoreError> {
        ctx.check()?;
        let conn = self.lock()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO scan_reports (
                uuid, digest, registration_uuid, mime_type, report, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                report.uuid,
                report.digest,
                report.registration_uuid,
                report.mime_type,
                report.report,
                now,
            ],
        )
        .map_err(|e| map_insert_error(e, report))?;

        debug!(
            uuid = %report.uuid,
            digest = %report.digest,
            registration_uuid = %report.registration_uuid,
            mime_type = %report.mime_type,
            "Report row inserted"
        );

        Ok(Report {
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..report.clone()
        })
    }

    fn delete_many(&self, ctx: &RequestContext, query: &Query) -> Result<u64, StoreError> {
        ctx.check()?;
        let (clause, values) = where_clause(query)?;
        let conn = self.lock()?;

        let sql = format!("DELETE FROM scan_reports{}", clause);
        let affected = conn.execute(&sql, params_from_iter(values.iter()))?;

        debug!(filter = %clause.trim(), deleted = affected, "Report rows deleted");
        Ok(affected as u64)
    }

    fn update_field(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        field: MutableField,
        value: &str,
    ) -> Result<(), StoreError> {
        ctx.check()?;
        let conn = self.lock()?;
        let now = chrono::Utc::now().to_rfc3339();

        let sql = format!(
            "UPDATE scan_reports SET {} = ?1, updated_at = ?2 WHERE uuid = ?3",
            field.column()
        );
        let affected = conn.execute(&sql, params![value, now, uuid])?;

        debug!(uuid = %uuid, field = %field, updated = affected, "Report field updated");
        Ok(())
    }

    fn list(&self, ctx: &RequestContext, query: &Query) -> Result<Vec<Report>, StoreError> {
        ctx.check()?;
        let (clause, values) = where_clause(query)?;

        let mut sql = format!("SELECT {} FROM scan_reports{}", REPORT_COLUMNS, clause);
        match &query.sort {
            Some(sort) => {
                let column = sort_column(&sort.key)?;
                let order = match sort.order {
                    SortOrder::Asc => "ASC",
                    SortOrder::Desc => "DESC",
                };
                sql.push_str(&format!(" ORDER BY {} {}, id {}", column, order, order));
            }
            None => sql.push_str(" ORDER BY id"),
        }

        if let Some((limit, offset)) = query.page_window() {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(Report {
                uuid: row.get(0)?,
                digest: row.get(1)?,
                registration_uuid: row.get(2)?,
                mime_type: row.get(3)?,
                report: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;

        let results: Result<Vec<_>, _> = rows.collect();
        Ok(results?)
    }
}
