use crate::reports::{self, ReportContext, ReportFn};
use redditstats_core::{Comment, CoreError, Post, Row, Snapshot};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Every registered report, in catalogue order.
///
/// The source catalogue's "most active authors" statement never parsed and
/// has no counterpart here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    SubredditOverview,
    TopPosts,
    HourlyPattern,
    WeekdayPattern,
    ContentTypes,
    EngagementAnalysis,
    CommentRollup,
    TopCommenters,
    DailyTrend,
    TitleSignals,
    FeatureCorrelation,
    WeeklySummary,
    OcComparison,
    PerformanceTiers,
    DailyStats,
}

impl ReportKind {
    pub const ALL: [ReportKind; 15] = [
        ReportKind::SubredditOverview,
        ReportKind::TopPosts,
        ReportKind::HourlyPattern,
        ReportKind::WeekdayPattern,
        ReportKind::ContentTypes,
        ReportKind::EngagementAnalysis,
        ReportKind::CommentRollup,
        ReportKind::TopCommenters,
        ReportKind::DailyTrend,
        ReportKind::TitleSignals,
        ReportKind::FeatureCorrelation,
        ReportKind::WeeklySummary,
        ReportKind::OcComparison,
        ReportKind::PerformanceTiers,
        ReportKind::DailyStats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::SubredditOverview => "subreddit_overview",
            ReportKind::TopPosts => "top_posts",
            ReportKind::HourlyPattern => "hourly_pattern",
            ReportKind::WeekdayPattern => "weekday_pattern",
            ReportKind::ContentTypes => "content_types",
            ReportKind::EngagementAnalysis => "engagement_analysis",
            ReportKind::CommentRollup => "comment_rollup",
            ReportKind::TopCommenters => "top_commenters",
            ReportKind::DailyTrend => "daily_trend",
            ReportKind::TitleSignals => "title_signals",
            ReportKind::FeatureCorrelation => "feature_correlation",
            ReportKind::WeeklySummary => "weekly_summary",
            ReportKind::OcComparison => "oc_comparison",
            ReportKind::PerformanceTiers => "performance_tiers",
            ReportKind::DailyStats => "daily_stats",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportKind::SubredditOverview => "Post count and score range per subreddit",
            ReportKind::TopPosts => "Highest-scoring post(s) in each subreddit",
            ReportKind::HourlyPattern => "Activity by hour of posting",
            ReportKind::WeekdayPattern => "Activity by day of the week",
            ReportKind::ContentTypes => "Video, text, OC and NSFW counts per subreddit",
            ReportKind::EngagementAnalysis => "Engagement and upvote ratio per score category",
            ReportKind::CommentRollup => "Comment totals and commenters per subreddit",
            ReportKind::TopCommenters => "Commenters with at least 3 comments per subreddit",
            ReportKind::DailyTrend => "Daily post volume and scores per subreddit",
            ReportKind::TitleSignals => "Title length, questions and all-caps share",
            ReportKind::FeatureCorrelation => "Correlation of post features with score",
            ReportKind::WeeklySummary => "Trailing 7-day summary per subreddit",
            ReportKind::OcComparison => "Original content versus other posts",
            ReportKind::PerformanceTiers => "Score tier and subreddit rank of every post",
            ReportKind::DailyStats => "Today's rollup per subreddit",
        }
    }

    fn definition(&self) -> ReportFn {
        match self {
            ReportKind::SubredditOverview => reports::subreddit_overview,
            ReportKind::TopPosts => reports::top_posts,
            ReportKind::HourlyPattern => reports::hourly_pattern,
            ReportKind::WeekdayPattern => reports::weekday_pattern,
            ReportKind::ContentTypes => reports::content_types,
            ReportKind::EngagementAnalysis => reports::engagement_analysis,
            ReportKind::CommentRollup => reports::comment_rollup,
            ReportKind::TopCommenters => reports::top_commenters,
            ReportKind::DailyTrend => reports::daily_trend,
            ReportKind::TitleSignals => reports::title_signals,
            ReportKind::FeatureCorrelation => reports::feature_correlation,
            ReportKind::WeeklySummary => reports::weekly_summary,
            ReportKind::OcComparison => reports::oc_comparison,
            ReportKind::PerformanceTiers => reports::performance_tiers,
            ReportKind::DailyStats => reports::daily_stats,
        }
    }

    /// Column names in output order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ReportKind::SubredditOverview => &[
                "subreddit",
                "post_count",
                "avg_score",
                "avg_comments",
                "max_score",
                "min_score",
            ],
            ReportKind::TopPosts => &[
                "subreddit",
                "id",
                "title",
                "author",
                "score",
                "num_comments",
            ],
            ReportKind::HourlyPattern => {
                &["hour_posted", "post_count", "avg_score", "avg_comments"]
            }
            ReportKind::WeekdayPattern => &[
                "day_of_week",
                "day_name",
                "post_count",
                "avg_score",
                "avg_comments",
            ],
            ReportKind::ContentTypes => &[
                "subreddit",
                "total_posts",
                "video_posts",
                "text_posts",
                "oc_posts",
                "nsfw_posts",
            ],
            ReportKind::EngagementAnalysis => &[
                "subreddit",
                "score_category",
                "post_count",
                "avg_engagement_rate",
                "avg_upvote_ratio",
            ],
            ReportKind::CommentRollup => &[
                "subreddit",
                "total_comments",
                "avg_comment_score",
                "unique_commenters",
            ],
            ReportKind::TopCommenters => &["subreddit", "author", "comment_count"],
            ReportKind::DailyTrend => {
                &["date", "subreddit", "post_count", "avg_score", "max_score"]
            }
            ReportKind::TitleSignals => &[
                "subreddit",
                "avg_title_length",
                "question_ratio",
                "all_caps_ratio",
            ],
            ReportKind::FeatureCorrelation => &[
                "subreddit",
                "title_length_score_corr",
                "selftext_length_score_corr",
                "hour_score_corr",
            ],
            ReportKind::WeeklySummary => &[
                "subreddit",
                "post_count",
                "avg_score",
                "score_stddev",
                "avg_comments",
                "unique_authors",
            ],
            ReportKind::OcComparison => &[
                "subreddit",
                "oc_avg_score",
                "non_oc_avg_score",
                "oc_percentage",
            ],
            ReportKind::PerformanceTiers => &[
                "id",
                "subreddit",
                "title",
                "score",
                "performance_tier",
                "subreddit_rank",
            ],
            ReportKind::DailyStats => &[
                "subreddit",
                "date",
                "total_posts",
                "avg_score",
                "avg_comments",
                "top_post_score",
            ],
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| CoreError::UnknownReport {
                name: s.to_string(),
            })
    }
}

/// A finished report with its column list, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub report: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Row>,
}

/// Runs the named report against the given tables, evaluated at the
/// current time.
pub fn run(
    report_name: &str,
    posts: &[Post],
    comments: &[Comment],
) -> Result<Vec<Row>, CoreError> {
    let snapshot = Snapshot::new(posts.to_vec(), comments.to_vec());
    run_with_context(report_name, &snapshot, &ReportContext::current())
}

pub fn run_with_context(
    report_name: &str,
    snapshot: &Snapshot,
    ctx: &ReportContext,
) -> Result<Vec<Row>, CoreError> {
    let kind: ReportKind = report_name.parse()?;
    run_report(kind, snapshot, ctx).map(|output| output.rows)
}

pub fn run_report(
    kind: ReportKind,
    snapshot: &Snapshot,
    ctx: &ReportContext,
) -> Result<ReportOutput, CoreError> {
    let started = Instant::now();

    let restricted;
    let snapshot = match &ctx.subreddit {
        Some(subreddit) => {
            restricted = snapshot.restrict_to(subreddit);
            debug!(
                "Restricted {} to r/{} ({} posts)",
                kind,
                subreddit,
                restricted.posts.len()
            );
            &restricted
        }
        None => snapshot,
    };

    let rows = (kind.definition())(snapshot, ctx)?;
    info!(
        "Report {} produced {} rows in {:?}",
        kind,
        rows.len(),
        started.elapsed()
    );

    Ok(ReportOutput {
        report: kind.name(),
        columns: kind.columns().to_vec(),
        rows,
    })
}

/// Runs every registered report. A failing report does not stop the rest.
pub fn run_all(
    snapshot: &Snapshot,
    ctx: &ReportContext,
) -> Vec<(ReportKind, Result<ReportOutput, CoreError>)> {
    ReportKind::ALL
        .into_iter()
        .map(|kind| {
            let result = run_report(kind, snapshot, ctx);
            if let Err(e) = &result {
                warn!("Report {} failed: {}", kind, e);
            }
            (kind, result)
        })
        .collect()
}
