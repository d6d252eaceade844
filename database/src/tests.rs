use crate::Database;
use redditstats_core::{load_snapshot, CoreError, DatabaseError, SchemaAccessor};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, SqlitePool};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const ETL_SCHEMA: &str = r#"
    CREATE TABLE posts (
        id TEXT PRIMARY KEY,
        title TEXT,
        author TEXT,
        subreddit TEXT,
        score INTEGER,
        upvote_ratio REAL,
        num_comments INTEGER,
        created_utc TIMESTAMP,
        selftext TEXT,
        url TEXT,
        is_video BOOLEAN,
        is_original_content BOOLEAN,
        over_18 BOOLEAN,
        stickied BOOLEAN,
        locked BOOLEAN,
        title_length INTEGER,
        selftext_length INTEGER,
        has_selftext BOOLEAN,
        hour_posted INTEGER,
        day_of_week INTEGER,
        engagement_rate REAL,
        score_category TEXT,
        extracted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE comments (
        id TEXT PRIMARY KEY,
        post_id TEXT,
        author TEXT,
        body TEXT,
        score INTEGER,
        created_utc TIMESTAMP,
        parent_id TEXT,
        is_submitter BOOLEAN,
        extracted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (post_id) REFERENCES posts (id)
    );
"#;

fn temp_db_path() -> PathBuf {
    env::temp_dir().join(format!("test_redditstats_{}.db", uuid::Uuid::new_v4()))
}

async fn writable_pool(path: &PathBuf) -> SqlitePool {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .expect("valid sqlite url")
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create test database")
}

async fn seed(path: &PathBuf, statements: &str) {
    let pool = writable_pool(path).await;
    pool.execute(statements)
        .await
        .expect("Failed to seed test database");
    pool.close().await;
}

async fn open(path: &PathBuf) -> Database {
    let mut db = Database::new(format!("sqlite://{}", path.display()));
    db.connect()
        .await
        .expect("Failed to connect to test database");
    db
}

async fn setup_etl_db() -> (PathBuf, Database) {
    let path = temp_db_path();
    let seed_sql = format!(
        "{ETL_SCHEMA}
        INSERT INTO posts (id, title, author, subreddit, score, upvote_ratio, num_comments,
            created_utc, selftext, url, is_video, is_original_content, over_18, stickied, locked,
            title_length, selftext_length, has_selftext, hour_posted, day_of_week,
            engagement_rate, score_category)
        VALUES
            ('p2', 'Second', 'bob', 'rust', 42, 0.93, 7, '2024-03-04 15:30:00', '', 'https://b',
             0, 1, 0, 0, 0, 6, 0, 0, 15, 0, 0.1627, 'Medium'),
            ('p1', 'First?', '[deleted]', 'python', -3, 0.40, 0, '2024-03-03 08:00:00', 'body',
             'https://a', 1, 0, 1, 1, 0, 6, 4, 1, 8, 6, 0.0, 'Negative');
        INSERT INTO comments (id, post_id, author, body, score, created_utc, parent_id, is_submitter)
        VALUES
            ('c1', 'p2', 'carol', 'nice', 5, '2024-03-04 16:00:00', 't3_p2', 0),
            ('c2', 'p2', '[deleted]', '[removed]', 1, '2024-03-04 16:05:00', 't1_c1', 0);"
    );
    seed(&path, &seed_sql).await;
    let db = open(&path).await;
    (path, db)
}

#[tokio::test]
async fn test_posts_read_in_rowid_order() {
    let (path, db) = setup_etl_db().await;

    let posts = db.list_posts().await.expect("Failed to list posts");
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, "p2");
    assert_eq!(posts[1].id, "p1");

    let p2 = &posts[0];
    assert_eq!(p2.subreddit, "rust");
    assert_eq!(p2.score, Some(42));
    assert_eq!(p2.hour_posted, Some(15));
    assert_eq!(p2.is_original_content, Some(true));
    assert_eq!(p2.url.as_deref(), Some("https://b"));
    assert_eq!(p2.score_category.as_deref(), Some("Medium"));
    assert_eq!(
        p2.created_utc.map(|t| t.to_string()),
        Some("2024-03-04 15:30:00".to_string())
    );

    let p1 = &posts[1];
    assert_eq!(p1.author.as_deref(), Some("[deleted]"));
    assert_eq!(p1.is_video, Some(true));
    assert_eq!(p1.score, Some(-3));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_comments_and_snapshot() {
    let (path, db) = setup_etl_db().await;

    let snapshot = load_snapshot(&db).await.expect("Failed to load snapshot");
    assert_eq!(snapshot.posts.len(), 2);
    assert_eq!(snapshot.comments.len(), 2);
    assert_eq!(snapshot.comments[0].post_id, "p2");
    assert_eq!(snapshot.comments[0].known_author(), Some("carol"));
    assert_eq!(snapshot.comments[1].known_author(), None);
    assert_eq!(snapshot.comments[1].parent_id.as_deref(), Some("t1_c1"));

    // Reading twice from an unchanged store yields the same rows.
    let again = db.list_posts().await.unwrap();
    assert_eq!(again, snapshot.posts);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_null_attribute_becomes_schema_mismatch_on_access() {
    let path = temp_db_path();
    seed(
        &path,
        &format!("{ETL_SCHEMA} INSERT INTO posts (id, subreddit, title) VALUES ('p9', 'rust', 't');"),
    )
    .await;
    let db = open(&path).await;

    let posts = db.list_posts().await.expect("NULL attributes still load");
    assert_eq!(posts[0].score, None);
    assert!(matches!(
        posts[0].score(),
        Err(CoreError::SchemaMismatch { column: "score", .. })
    ));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_optional_columns_may_be_absent() {
    let path = temp_db_path();
    seed(
        &path,
        "CREATE TABLE comments (id TEXT PRIMARY KEY, post_id TEXT, author TEXT, score INTEGER);
         INSERT INTO comments VALUES ('c1', 'p1', 'dave', 3);",
    )
    .await;
    let db = open(&path).await;

    let comments = db.list_comments().await.expect("Failed to list comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].score, Some(3));
    assert!(comments[0].body.is_none());
    assert!(comments[0].created_utc.is_none());

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_missing_table_is_data_unavailable() {
    let path = temp_db_path();
    seed(&path, "CREATE TABLE unrelated (x INTEGER);").await;
    let db = open(&path).await;

    let err = db.list_posts().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::DataUnavailable(DatabaseError::MissingTable { ref table }) if table == "posts"
    ));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_missing_required_column_is_data_unavailable() {
    let path = temp_db_path();
    seed(
        &path,
        "CREATE TABLE comments (id TEXT PRIMARY KEY, post_id TEXT, author TEXT);",
    )
    .await;
    let db = open(&path).await;

    let err = db.list_comments().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::DataUnavailable(DatabaseError::MissingColumn { ref column, .. }) if column == "score"
    ));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_missing_file_is_not_created() {
    let path = temp_db_path();
    let mut db = Database::new(format!("sqlite://{}", path.display()));

    let err = db.connect().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::DataUnavailable(DatabaseError::ConnectionFailed { .. })
    ));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_listing_before_connect() {
    let db = Database::new("sqlite::memory:".to_string());
    assert!(!db.is_connected());
    let err = db.list_posts().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::DataUnavailable(DatabaseError::NotConnected)
    ));
}
