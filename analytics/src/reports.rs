//! The report catalogue. Each report is a pure function of the snapshot and
//! the evaluation context, returning rows in a fixed column order.
//!
//! Attributes a report computes with are read through the checked `Post`
//! accessors, so a NULL there fails that report with `SchemaMismatch`.
//! Attributes that are only displayed (title, author) pass through as NULL.

use crate::aggregate::{
    bucket, distinct_count, fraction, group_by, mean, pearson_correlation, rank_within_group,
    sample_stddev, sort_by_float, try_group_by, SortOrder,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use redditstats_core::{CoreError, Post, Record, Row, Snapshot};
use std::collections::{BTreeMap, HashMap};

/// Signature shared by every report definition.
pub type ReportFn = fn(&Snapshot, &ReportContext) -> Result<Vec<Row>, CoreError>;

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const PERFORMANCE_TIERS: [(i64, &str); 4] = [
    (1000, "Viral"),
    (100, "Popular"),
    (10, "Good"),
    (i64::MIN, "Low"),
];

/// Commenters need at least this many comments in a subreddit to be listed.
pub const TOP_COMMENTER_MIN_COMMENTS: usize = 3;

pub const TRAILING_WINDOW_DAYS: i64 = 7;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inputs a report needs besides the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    /// Evaluation time for reports relative to "now", in the snapshot's
    /// timestamp convention (naive, as written by the ETL).
    pub now: NaiveDateTime,
    /// Restrict every report to one subreddit's posts.
    pub subreddit: Option<String>,
}

impl ReportContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now,
            subreddit: None,
        }
    }

    pub fn current() -> Self {
        Self::new(Utc::now().naive_utc())
    }

    pub fn restrict_to(mut self, subreddit: impl Into<String>) -> Self {
        self.subreddit = Some(subreddit.into());
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::current()
    }
}

fn by_subreddit(posts: &[Post]) -> BTreeMap<&str, Vec<&Post>> {
    group_by(posts.iter(), |post| post.subreddit.as_str())
}

fn collect<'a, T, F>(posts: &[&'a Post], field: F) -> Result<Vec<T>, CoreError>
where
    F: Fn(&'a Post) -> Result<T, CoreError>,
{
    posts.iter().map(|post| field(*post)).collect()
}

fn floats(values: &[i64]) -> Vec<f64> {
    values.iter().map(|v| *v as f64).collect()
}

fn count_true<'a, F>(posts: &[&'a Post], flag: F) -> Result<usize, CoreError>
where
    F: Fn(&'a Post) -> Result<bool, CoreError>,
{
    Ok(collect(posts, flag)?.into_iter().filter(|v| *v).count())
}

/// Post count, mean score and mean comment count of one group.
fn activity_row(row: Row, posts: &[&Post]) -> Result<Row, CoreError> {
    let scores = floats(&collect(posts, Post::score)?);
    let comments = floats(&collect(posts, Post::num_comments)?);
    Ok(row
        .with("post_count", posts.len())
        .with("avg_score", mean(&scores))
        .with("avg_comments", mean(&comments)))
}

/// Subreddit of every post, for joining comments onto posts.
fn post_subreddits(posts: &[Post]) -> HashMap<&str, &str> {
    posts
        .iter()
        .map(|post| (post.id.as_str(), post.subreddit.as_str()))
        .collect()
}

pub fn subreddit_overview(
    snapshot: &Snapshot,
    _ctx: &ReportContext,
) -> Result<Vec<Row>, CoreError> {
    let mut rows = Vec::new();
    for (subreddit, posts) in by_subreddit(&snapshot.posts) {
        let scores = collect(&posts, Post::score)?;
        let comments = floats(&collect(&posts, Post::num_comments)?);
        let row = Row::new()
            .with("subreddit", subreddit)
            .with("post_count", posts.len())
            .with("avg_score", mean(&floats(&scores)))
            .with("avg_comments", mean(&comments))
            .with("max_score", scores.iter().max().copied())
            .with("min_score", scores.iter().min().copied());
        rows.push((posts.len(), row));
    }
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

pub fn top_posts(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    let mut winners: Vec<(&Post, i64)> = Vec::new();
    for (_, posts) in by_subreddit(&snapshot.posts) {
        let scores = collect(&posts, Post::score)?;
        let Some(max_score) = scores.iter().max().copied() else {
            continue;
        };
        winners.extend(
            posts
                .into_iter()
                .zip(scores)
                .filter(|(_, score)| *score == max_score),
        );
    }
    winners.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(winners
        .into_iter()
        .map(|(post, score)| {
            Row::new()
                .with("subreddit", post.subreddit.as_str())
                .with("id", post.id.as_str())
                .with("title", post.title.as_deref())
                .with("author", post.author.as_deref())
                .with("score", score)
                .with("num_comments", post.num_comments)
        })
        .collect())
}

pub fn hourly_pattern(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    try_group_by(snapshot.posts.iter(), |post| post.hour_posted())?
        .into_iter()
        .map(|(hour, posts)| activity_row(Row::new().with("hour_posted", hour), &posts))
        .collect()
}

pub fn weekday_pattern(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    try_group_by(snapshot.posts.iter(), |post| post.day_of_week())?
        .into_iter()
        .map(|(day, posts)| {
            let name = usize::try_from(day)
                .ok()
                .and_then(|index| DAY_NAMES.get(index).copied());
            let row = Row::new().with("day_of_week", day).with("day_name", name);
            activity_row(row, &posts)
        })
        .collect()
}

pub fn content_types(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    by_subreddit(&snapshot.posts)
        .into_iter()
        .map(|(subreddit, posts)| {
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with("total_posts", posts.len())
                .with("video_posts", count_true(&posts, Post::is_video)?)
                .with("text_posts", count_true(&posts, Post::has_selftext)?)
                .with("oc_posts", count_true(&posts, Post::is_original_content)?)
                .with("nsfw_posts", count_true(&posts, Post::over_18)?))
        })
        .collect()
}

pub fn engagement_analysis(
    snapshot: &Snapshot,
    _ctx: &ReportContext,
) -> Result<Vec<Row>, CoreError> {
    let groups = try_group_by(snapshot.posts.iter(), |post| {
        post.score_category()
            .map(|category| (post.subreddit.as_str(), category))
    })?;

    groups
        .into_iter()
        .map(|((subreddit, category), posts)| {
            let engagement = collect(&posts, Post::engagement_rate)?;
            let upvote_ratio = collect(&posts, Post::upvote_ratio)?;
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with("score_category", category)
                .with("post_count", posts.len())
                .with("avg_engagement_rate", mean(&engagement))
                .with("avg_upvote_ratio", mean(&upvote_ratio)))
        })
        .collect()
}

pub fn comment_rollup(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    let subreddit_of = post_subreddits(&snapshot.posts);
    let comments_by_subreddit = group_by(
        snapshot
            .comments
            .iter()
            .filter_map(|comment| Some((*subreddit_of.get(comment.post_id.as_str())?, comment))),
        |(subreddit, _)| *subreddit,
    );

    // Driven by posts so a subreddit without comments still gets a row.
    by_subreddit(&snapshot.posts)
        .into_keys()
        .map(|subreddit| {
            let comments: Vec<_> = comments_by_subreddit
                .get(subreddit)
                .map(|entries| entries.iter().map(|(_, comment)| *comment).collect())
                .unwrap_or_default();
            let scores = comments
                .iter()
                .map(|comment| comment.score().map(|s| s as f64))
                .collect::<Result<Vec<_>, _>>()?;
            let commenters = distinct_count(comments.iter().map(|c| c.author.as_deref()));
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with("total_comments", comments.len())
                .with("avg_comment_score", mean(&scores))
                .with("unique_commenters", commenters))
        })
        .collect()
}

pub fn top_commenters(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    let subreddit_of = post_subreddits(&snapshot.posts);
    let groups = group_by(
        snapshot.comments.iter().filter_map(|comment| {
            let subreddit = *subreddit_of.get(comment.post_id.as_str())?;
            Some((subreddit, comment.known_author()?))
        }),
        |key| *key,
    );

    let mut rows: Vec<(&str, usize, &str)> = groups
        .into_iter()
        .map(|((subreddit, author), comments)| (subreddit, comments.len(), author))
        .filter(|(_, count, _)| *count >= TOP_COMMENTER_MIN_COMMENTS)
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    Ok(rows
        .into_iter()
        .map(|(subreddit, count, author)| {
            Row::new()
                .with("subreddit", subreddit)
                .with("author", author)
                .with("comment_count", count)
        })
        .collect())
}

pub fn daily_trend(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    let groups = try_group_by(snapshot.posts.iter(), |post| {
        post.created_utc()
            .map(|created| (created.date(), post.subreddit.as_str()))
    })?;

    let mut rows = Vec::with_capacity(groups.len());
    for ((date, subreddit), posts) in groups {
        let scores = collect(&posts, Post::score)?;
        let row = Row::new()
            .with("date", date.format(DATE_FORMAT).to_string())
            .with("subreddit", subreddit)
            .with("post_count", posts.len())
            .with("avg_score", mean(&floats(&scores)))
            .with("max_score", scores.iter().max().copied());
        rows.push((date, row));
    }
    // Groups arrive subreddit-ascending within a date; the stable sort keeps that.
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

pub fn title_signals(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    by_subreddit(&snapshot.posts)
        .into_iter()
        .map(|(subreddit, posts)| {
            let lengths = floats(&collect(&posts, Post::title_length)?);
            let titles = collect(&posts, Post::title)?;
            let questions = titles.iter().filter(|t| t.contains('?')).count();
            let all_caps = titles.iter().filter(|t| t.to_uppercase() == **t).count();
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with("avg_title_length", mean(&lengths))
                .with("question_ratio", fraction(questions, titles.len()))
                .with("all_caps_ratio", fraction(all_caps, titles.len())))
        })
        .collect()
}

pub fn feature_correlation(
    snapshot: &Snapshot,
    _ctx: &ReportContext,
) -> Result<Vec<Row>, CoreError> {
    let mut positive: Vec<&Post> = Vec::new();
    for post in &snapshot.posts {
        if post.score()? > 0 {
            positive.push(post);
        }
    }

    group_by(positive, |post| post.subreddit.as_str())
        .into_iter()
        .map(|(subreddit, posts)| {
            let scores = floats(&collect(&posts, Post::score)?);
            let title_lengths = floats(&collect(&posts, Post::title_length)?);
            let selftext_lengths = floats(&collect(&posts, Post::selftext_length)?);
            let hours = floats(&collect(&posts, Post::hour_posted)?);
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with(
                    "title_length_score_corr",
                    pearson_correlation(&title_lengths, &scores),
                )
                .with(
                    "selftext_length_score_corr",
                    pearson_correlation(&selftext_lengths, &scores),
                )
                .with("hour_score_corr", pearson_correlation(&hours, &scores)))
        })
        .collect()
}

pub fn weekly_summary(snapshot: &Snapshot, ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    let cutoff = ctx.now - Duration::days(TRAILING_WINDOW_DAYS);
    let mut recent: Vec<&Post> = Vec::new();
    for post in &snapshot.posts {
        if post.created_utc()? >= cutoff {
            recent.push(post);
        }
    }

    let mut rows = Vec::new();
    for (subreddit, posts) in group_by(recent, |post| post.subreddit.as_str()) {
        let scores = floats(&collect(&posts, Post::score)?);
        let comments = floats(&collect(&posts, Post::num_comments)?);
        let avg_score = mean(&scores);
        let row = Row::new()
            .with("subreddit", subreddit)
            .with("post_count", posts.len())
            .with("avg_score", avg_score)
            .with("score_stddev", sample_stddev(&scores))
            .with("avg_comments", mean(&comments))
            .with(
                "unique_authors",
                distinct_count(posts.iter().map(|post| post.author.as_deref())),
            );
        rows.push((avg_score, row));
    }
    sort_by_float(&mut rows, |(avg, _)| *avg, SortOrder::Descending);
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

pub fn oc_comparison(snapshot: &Snapshot, _ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    by_subreddit(&snapshot.posts)
        .into_iter()
        .map(|(subreddit, posts)| {
            let mut oc_scores = Vec::new();
            let mut other_scores = Vec::new();
            for post in &posts {
                let score = post.score()? as f64;
                if post.is_original_content()? {
                    oc_scores.push(score);
                } else {
                    other_scores.push(score);
                }
            }
            let oc_percentage = fraction(oc_scores.len(), posts.len()).map(|f| f * 100.0);
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with("oc_avg_score", mean(&oc_scores))
                .with("non_oc_avg_score", mean(&other_scores))
                .with("oc_percentage", oc_percentage))
        })
        .collect()
}

pub fn performance_tier(score: i64) -> &'static str {
    bucket(score, &PERFORMANCE_TIERS).copied().unwrap_or("Low")
}

pub fn performance_tiers(
    snapshot: &Snapshot,
    _ctx: &ReportContext,
) -> Result<Vec<Row>, CoreError> {
    let mut scored = snapshot
        .posts
        .iter()
        .map(|post| post.score().map(|score| (post, score)))
        .collect::<Result<Vec<_>, _>>()?;

    let ranks = rank_within_group(
        &scored,
        |(post, _)| post.id().to_string(),
        |(post, _)| post.subreddit.clone(),
        |(_, score)| *score,
        SortOrder::Descending,
    );
    let rank_of = |post: &Post| ranks.get(post.id()).copied().unwrap_or_default();

    scored.sort_by(|a, b| {
        a.0.subreddit
            .cmp(&b.0.subreddit)
            .then(rank_of(a.0).cmp(&rank_of(b.0)))
    });

    Ok(scored
        .into_iter()
        .map(|(post, score)| {
            Row::new()
                .with("id", post.id.as_str())
                .with("subreddit", post.subreddit.as_str())
                .with("title", post.title.as_deref())
                .with("score", score)
                .with("performance_tier", performance_tier(score))
                .with("subreddit_rank", rank_of(post))
        })
        .collect())
}

/// Per-subreddit rollup of the posts created on the evaluation date.
pub fn daily_stats(snapshot: &Snapshot, ctx: &ReportContext) -> Result<Vec<Row>, CoreError> {
    let today = ctx.today();
    let mut todays: Vec<&Post> = Vec::new();
    for post in &snapshot.posts {
        if post.created_utc()?.date() == today {
            todays.push(post);
        }
    }

    group_by(todays, |post| post.subreddit.as_str())
        .into_iter()
        .map(|(subreddit, posts)| {
            let scores = collect(&posts, Post::score)?;
            let comments = floats(&collect(&posts, Post::num_comments)?);
            Ok(Row::new()
                .with("subreddit", subreddit)
                .with("date", today.format(DATE_FORMAT).to_string())
                .with("total_posts", posts.len())
                .with("avg_score", mean(&floats(&scores)))
                .with("avg_comments", mean(&comments))
                .with("top_post_score", scores.iter().max().copied()))
        })
        .collect()
}
