use redditstats_core::{
    ConfigError, CoreError, DatabaseError, ErrorExt, ErrorReporter, Post, Snapshot,
};

#[test]
fn test_error_codes() {
    let unavailable = CoreError::DataUnavailable(DatabaseError::MissingTable {
        table: "posts".to_string(),
    });
    assert_eq!(unavailable.error_code(), "DATA_UNAVAILABLE");

    let mismatch = CoreError::schema_mismatch("posts", "score", "abc123");
    assert_eq!(mismatch.error_code(), "SCHEMA_MISMATCH");

    let unknown = CoreError::UnknownReport {
        name: "most_active_authors".to_string(),
    };
    assert_eq!(unknown.error_code(), "UNKNOWN_REPORT");

    let config_error = CoreError::Config(ConfigError::FileNotFound {
        path: "redditstats.toml".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");
}

#[test]
fn test_database_error_codes() {
    assert_eq!(DatabaseError::NotConnected.error_code(), "DB_NOT_CONNECTED");
    let missing = DatabaseError::MissingColumn {
        table: "posts".to_string(),
        column: "score".to_string(),
    };
    assert_eq!(missing.error_code(), "DB_MISSING_COLUMN");
}

#[test]
fn test_schema_mismatch_from_post_accessor() {
    let post = Post::new("p1", "rust");
    let err = post.score().unwrap_err();
    match &err {
        CoreError::SchemaMismatch {
            table,
            column,
            record_id,
        } => {
            assert_eq!(*table, "posts");
            assert_eq!(*column, "score");
            assert_eq!(record_id, "p1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Schema mismatch: posts.score is missing on record p1"
    );
}

#[test]
fn test_user_friendly_messages() {
    let missing_table = CoreError::DataUnavailable(DatabaseError::MissingTable {
        table: "comments".to_string(),
    });
    let message = missing_table.user_friendly_message();
    assert!(message.contains("'comments'"));
    assert!(message.contains("ETL"));

    let unknown = CoreError::UnknownReport {
        name: "nope".to_string(),
    };
    assert!(unknown.user_friendly_message().contains("redditstats list"));

    let mismatch = CoreError::schema_mismatch("comments", "score", "c9");
    let message = mismatch.user_friendly_message();
    assert!(message.contains("c9"));
    assert!(message.contains("score"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::DataUnavailable(DatabaseError::NotConnected);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&error);
}

#[test]
fn test_restrict_snapshot_keeps_attached_comments() {
    use redditstats_core::Comment;

    let snapshot = Snapshot::new(
        vec![Post::new("p1", "rust"), Post::new("p2", "python")],
        vec![
            Comment::new("c1", "p1"),
            Comment::new("c2", "p2"),
            Comment::new("c3", "p1"),
        ],
    );

    let restricted = snapshot.restrict_to("rust");
    assert_eq!(restricted.posts.len(), 1);
    let ids: Vec<&str> = restricted.comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c3"]);
}

#[tokio::test]
async fn test_in_memory_snapshot_accessor() {
    let snapshot = Snapshot::new(vec![Post::new("p1", "rust")], Vec::new());
    let loaded = redditstats_core::load_snapshot(&snapshot).await.unwrap();
    assert_eq!(loaded.posts, snapshot.posts);
    assert!(loaded.comments.is_empty());
}
