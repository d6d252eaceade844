use chrono::NaiveDateTime;
use redditstats_core::{
    Comment, CoreError, DatabaseError, Post, SchemaAccessor, COMMENTS_TABLE, POSTS_TABLE,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Type};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

const POST_REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "subreddit",
    "title",
    "author",
    "score",
    "upvote_ratio",
    "num_comments",
    "created_utc",
    "is_video",
    "is_original_content",
    "over_18",
    "title_length",
    "selftext_length",
    "has_selftext",
    "hour_posted",
    "day_of_week",
    "engagement_rate",
    "score_category",
];
const POST_OPTIONAL_COLUMNS: &[&str] = &["url", "stickied", "locked"];

const COMMENT_REQUIRED_COLUMNS: &[&str] = &["id", "post_id", "author", "score"];
const COMMENT_OPTIONAL_COLUMNS: &[&str] = &["body", "parent_id", "is_submitter", "created_utc"];

/// Read-only access to the SQLite file written by the ETL pipeline.
pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    /// Opens the snapshot read-only. A missing file is an error, never created.
    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: format!("invalid database url '{}': {e}", self.connection_string),
            })?
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: format!("{}: {e}", self.connection_string),
            })?;

        info!("Connected to snapshot at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            debug!("Closed snapshot connection");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    fn pool(&self) -> Result<&SqlitePool, DatabaseError> {
        self.pool.as_ref().ok_or(DatabaseError::NotConnected)
    }

    async fn table_columns(&self, table: &str) -> Result<HashSet<String>, DatabaseError> {
        let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
            .fetch_all(self.pool()?)
            .await?;

        if rows.is_empty() {
            return Err(DatabaseError::MissingTable {
                table: table.to_string(),
            });
        }

        rows.iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(DatabaseError::from)
    }

    /// Builds the SELECT for `table`, substituting NULL for absent optional
    /// columns so every row decodes the same way.
    async fn select_statement(
        &self,
        table: &str,
        required: &[&str],
        optional: &[&str],
    ) -> Result<String, DatabaseError> {
        let present = self.table_columns(table).await?;

        if let Some(column) = required.iter().find(|c| !present.contains(**c)) {
            return Err(DatabaseError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        let mut select_list: Vec<String> = vec!["rowid AS _rowid".to_string()];
        select_list.extend(required.iter().map(|c| c.to_string()));
        for column in optional {
            if present.contains(*column) {
                select_list.push(column.to_string());
            } else {
                warn!("Table {table} has no {column} column, reading it as NULL");
                select_list.push(format!("NULL AS {column}"));
            }
        }

        Ok(format!(
            "SELECT {} FROM {table} ORDER BY rowid",
            select_list.join(", ")
        ))
    }

    async fn fetch_rows(
        &self,
        table: &str,
        required: &[&str],
        optional: &[&str],
    ) -> Result<Vec<SqliteRow>, DatabaseError> {
        let statement = self.select_statement(table, required, optional).await?;
        debug!("Reading {table}: {statement}");
        let rows = sqlx::query(&statement).fetch_all(self.pool()?).await?;
        Ok(rows)
    }
}

impl SchemaAccessor for Database {
    async fn list_posts(&self) -> Result<Vec<Post>, CoreError> {
        let rows = self
            .fetch_rows(POSTS_TABLE, POST_REQUIRED_COLUMNS, POST_OPTIONAL_COLUMNS)
            .await?;
        let posts = rows.iter().map(decode_post).collect::<Result<Vec<_>, _>>()?;
        debug!("Read {} posts", posts.len());
        Ok(posts)
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, CoreError> {
        let rows = self
            .fetch_rows(
                COMMENTS_TABLE,
                COMMENT_REQUIRED_COLUMNS,
                COMMENT_OPTIONAL_COLUMNS,
            )
            .await?;
        let comments = rows
            .iter()
            .map(decode_comment)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Read {} comments", comments.len());
        Ok(comments)
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<Option<T>, DatabaseError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    Ok(row.try_get::<Option<T>, _>(name)?)
}

/// Key columns identify the record, so a NULL there is reported by rowid.
fn key_column(
    row: &SqliteRow,
    table: &'static str,
    name: &'static str,
) -> Result<String, CoreError> {
    match column::<String>(row, name)? {
        Some(value) => Ok(value),
        None => {
            let rowid = column::<i64>(row, "_rowid")?.unwrap_or_default();
            Err(CoreError::schema_mismatch(
                table,
                name,
                &format!("rowid {rowid}"),
            ))
        }
    }
}

fn decode_post(row: &SqliteRow) -> Result<Post, CoreError> {
    Ok(Post {
        id: key_column(row, POSTS_TABLE, "id")?,
        subreddit: key_column(row, POSTS_TABLE, "subreddit")?,
        title: column(row, "title")?,
        author: column(row, "author")?,
        score: column(row, "score")?,
        num_comments: column(row, "num_comments")?,
        upvote_ratio: column(row, "upvote_ratio")?,
        created_utc: column::<NaiveDateTime>(row, "created_utc")?,
        url: column(row, "url")?,
        is_video: column(row, "is_video")?,
        is_original_content: column(row, "is_original_content")?,
        over_18: column(row, "over_18")?,
        stickied: column(row, "stickied")?,
        locked: column(row, "locked")?,
        has_selftext: column(row, "has_selftext")?,
        title_length: column(row, "title_length")?,
        selftext_length: column(row, "selftext_length")?,
        hour_posted: column(row, "hour_posted")?,
        day_of_week: column(row, "day_of_week")?,
        score_category: column(row, "score_category")?,
        engagement_rate: column(row, "engagement_rate")?,
    })
}

fn decode_comment(row: &SqliteRow) -> Result<Comment, CoreError> {
    Ok(Comment {
        id: key_column(row, COMMENTS_TABLE, "id")?,
        post_id: key_column(row, COMMENTS_TABLE, "post_id")?,
        author: column(row, "author")?,
        score: column(row, "score")?,
        body: column(row, "body")?,
        parent_id: column(row, "parent_id")?,
        is_submitter: column(row, "is_submitter")?,
        created_utc: column::<NaiveDateTime>(row, "created_utc")?,
    })
}
