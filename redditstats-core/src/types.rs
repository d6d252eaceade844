use crate::CoreError;
use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Author name the ETL writes for removed or anonymized accounts.
pub const DELETED_AUTHOR: &str = "[deleted]";

pub const POSTS_TABLE: &str = "posts";
pub const COMMENTS_TABLE: &str = "comments";

/// Anything with a stable identifier inside its table.
pub trait Record {
    fn id(&self) -> &str;
}

/// One row of the `posts` table.
///
/// Only `id` and `subreddit` are guaranteed. Everything else may be NULL in
/// the snapshot, so reports read it through the checked accessors, which
/// fail with [`CoreError::SchemaMismatch`] naming the record and column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: String,
    pub subreddit: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub upvote_ratio: Option<f64>,
    pub created_utc: Option<NaiveDateTime>,
    pub url: Option<String>,
    pub is_video: Option<bool>,
    pub is_original_content: Option<bool>,
    pub over_18: Option<bool>,
    pub stickied: Option<bool>,
    pub locked: Option<bool>,
    pub has_selftext: Option<bool>,
    pub title_length: Option<i64>,
    pub selftext_length: Option<i64>,
    pub hour_posted: Option<i64>,
    pub day_of_week: Option<i64>,
    pub score_category: Option<String>,
    pub engagement_rate: Option<f64>,
}

impl Post {
    pub fn new(id: impl Into<String>, subreddit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subreddit: subreddit.into(),
            ..Default::default()
        }
    }

    fn require<T>(&self, value: Option<T>, column: &'static str) -> Result<T, CoreError> {
        value.ok_or_else(|| CoreError::schema_mismatch(POSTS_TABLE, column, &self.id))
    }

    pub fn title(&self) -> Result<&str, CoreError> {
        self.require(self.title.as_deref(), "title")
    }

    pub fn score(&self) -> Result<i64, CoreError> {
        self.require(self.score, "score")
    }

    pub fn num_comments(&self) -> Result<i64, CoreError> {
        self.require(self.num_comments, "num_comments")
    }

    pub fn upvote_ratio(&self) -> Result<f64, CoreError> {
        self.require(self.upvote_ratio, "upvote_ratio")
    }

    pub fn created_utc(&self) -> Result<NaiveDateTime, CoreError> {
        self.require(self.created_utc, "created_utc")
    }

    pub fn is_video(&self) -> Result<bool, CoreError> {
        self.require(self.is_video, "is_video")
    }

    pub fn is_original_content(&self) -> Result<bool, CoreError> {
        self.require(self.is_original_content, "is_original_content")
    }

    pub fn over_18(&self) -> Result<bool, CoreError> {
        self.require(self.over_18, "over_18")
    }

    pub fn has_selftext(&self) -> Result<bool, CoreError> {
        self.require(self.has_selftext, "has_selftext")
    }

    pub fn title_length(&self) -> Result<i64, CoreError> {
        self.require(self.title_length, "title_length")
    }

    pub fn selftext_length(&self) -> Result<i64, CoreError> {
        self.require(self.selftext_length, "selftext_length")
    }

    pub fn hour_posted(&self) -> Result<i64, CoreError> {
        self.require(self.hour_posted, "hour_posted")
    }

    pub fn day_of_week(&self) -> Result<i64, CoreError> {
        self.require(self.day_of_week, "day_of_week")
    }

    pub fn score_category(&self) -> Result<&str, CoreError> {
        self.require(self.score_category.as_deref(), "score_category")
    }

    pub fn engagement_rate(&self) -> Result<f64, CoreError> {
        self.require(self.engagement_rate, "engagement_rate")
    }
}

impl Record for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One row of the `comments` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub body: Option<String>,
    pub parent_id: Option<String>,
    pub is_submitter: Option<bool>,
    pub created_utc: Option<NaiveDateTime>,
}

impl Comment {
    pub fn new(id: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            post_id: post_id.into(),
            ..Default::default()
        }
    }

    pub fn score(&self) -> Result<i64, CoreError> {
        self.score
            .ok_or_else(|| CoreError::schema_mismatch(COMMENTS_TABLE, "score", &self.id))
    }

    /// Author name unless the account was deleted or the value is missing.
    pub fn known_author(&self) -> Option<&str> {
        self.author
            .as_deref()
            .filter(|author| *author != DELETED_AUTHOR)
    }
}

impl Record for Comment {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Immutable pair of tables as loaded from the store, in load order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
}

impl Snapshot {
    pub fn new(posts: Vec<Post>, comments: Vec<Comment>) -> Self {
        Self { posts, comments }
    }

    /// Copy of the snapshot holding only one subreddit's posts and the
    /// comments attached to them.
    pub fn restrict_to(&self, subreddit: &str) -> Snapshot {
        let posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|post| post.subreddit == subreddit)
            .cloned()
            .collect();
        let post_ids: HashSet<&str> = posts.iter().map(|post| post.id.as_str()).collect();
        let comments = self
            .comments
            .iter()
            .filter(|comment| post_ids.contains(comment.post_id.as_str()))
            .cloned()
            .collect();
        Snapshot { posts, comments }
    }
}

/// A single cell of a report row.
///
/// Equality treats every NaN as equal to every other NaN, so rows holding
/// undefined statistics still compare equal to themselves.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) if v.is_nan() => write!(f, "NaN"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Text(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) if !v.is_finite() => serializer.serialize_none(),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One result row: named cells in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.cells.push((column, value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, value)| value)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
