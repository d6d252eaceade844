use crate::{Comment, CoreError, Post, Snapshot};
use tracing::info;

/// Read-only view over the `posts` and `comments` tables.
///
/// Implementations return rows in a stable order so repeated reads of an
/// unchanged store produce identical snapshots.
pub trait SchemaAccessor {
    async fn list_posts(&self) -> Result<Vec<Post>, CoreError>;

    async fn list_comments(&self) -> Result<Vec<Comment>, CoreError>;
}

impl SchemaAccessor for Snapshot {
    async fn list_posts(&self) -> Result<Vec<Post>, CoreError> {
        Ok(self.posts.clone())
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, CoreError> {
        Ok(self.comments.clone())
    }
}

pub async fn load_snapshot<A: SchemaAccessor>(accessor: &A) -> Result<Snapshot, CoreError> {
    let posts = accessor.list_posts().await?;
    let comments = accessor.list_comments().await?;
    info!(
        "Loaded snapshot with {} posts and {} comments",
        posts.len(),
        comments.len()
    );
    Ok(Snapshot::new(posts, comments))
}
