// src/presenter.rs
//! Shapes an [`EngagementReport`] into display-ready rows. Ordering and
//! numeric values come through unchanged from the analyzer; this layer only
//! adds labels, observation strings and the formatted best-time summary.

use serde::Serialize;

use crate::analyzer::{EngagementReport, GroupStat, HashtagCount};

const NO_TIME_DATA: &str = "Not enough data to determine optimal posting time";

#[derive(Debug, Clone, Serialize)]
pub struct InsightRow {
    pub label: String,
    pub mean_score: f64,
    pub sample_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightSection {
    pub title: String,
    pub rows: Vec<InsightRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightView {
    pub sections: Vec<InsightSection>,
    pub top_hashtags: Vec<HashtagCount>,
    pub best_posting_time: String,
    pub total_posts: usize,
    pub overall_mean_score: f64,
}

pub struct InsightPresenter;

impl InsightPresenter {
    pub fn present(report: &EngagementReport) -> InsightView {
        let overall = report.overall_mean_score;

        let sections = vec![
            InsightSection {
                title: "Engagement by content type".to_string(),
                rows: theme_rows(&report.content_type_ranking, overall),
            },
            InsightSection {
                title: "Engagement by topic".to_string(),
                rows: theme_rows(&report.topic_ranking, overall),
            },
            InsightSection {
                title: "Engagement by content length".to_string(),
                rows: length_rows(&report.length_ranking, overall),
            },
            InsightSection {
                title: "Best posting times".to_string(),
                rows: plain_rows(&report.time_ranking),
            },
        ];

        let best_posting_time = report
            .time_ranking
            .first()
            .map(|stat| format_time_label(&stat.key))
            .unwrap_or_else(|| NO_TIME_DATA.to_string());

        InsightView {
            sections,
            top_hashtags: report.top_hashtags.clone(),
            best_posting_time,
            total_posts: report.analyzed_posts,
            overall_mean_score: overall,
        }
    }
}

fn theme_rows(ranking: &[GroupStat], overall: f64) -> Vec<InsightRow> {
    ranking
        .iter()
        .map(|stat| InsightRow {
            label: stat.key.clone(),
            mean_score: stat.mean_score,
            sample_count: stat.sample_count,
            observation: Some(theme_observation(stat.mean_score, overall)),
        })
        .collect()
}

fn length_rows(ranking: &[GroupStat], overall: f64) -> Vec<InsightRow> {
    ranking
        .iter()
        .map(|stat| InsightRow {
            label: stat.key.clone(),
            mean_score: stat.mean_score,
            sample_count: stat.sample_count,
            observation: Some(length_observation(&stat.key, stat.mean_score, overall)),
        })
        .collect()
}

fn plain_rows(ranking: &[GroupStat]) -> Vec<InsightRow> {
    ranking
        .iter()
        .map(|stat| InsightRow {
            label: format_time_label(&stat.key),
            mean_score: stat.mean_score,
            sample_count: stat.sample_count,
            observation: None,
        })
        .collect()
}

fn theme_observation(mean: f64, overall: f64) -> String {
    if mean > overall * 1.2 {
        format!(
            "High engagement ({:.1}). Consider creating more content like this.",
            mean
        )
    } else if mean < overall * 0.8 {
        format!(
            "Low engagement ({:.1}). This may not resonate with your audience.",
            mean
        )
    } else {
        format!("Average engagement ({:.1}). Consistent performer.", mean)
    }
}

fn length_observation(label: &str, mean: f64, overall: f64) -> String {
    if mean > overall * 1.1 {
        format!("{} character posts perform well ({:.1})", label, mean)
    } else if mean < overall * 0.9 {
        format!("{} character posts underperform ({:.1})", label, mean)
    } else {
        format!(
            "{} character posts have average performance ({:.1})",
            label, mean
        )
    }
}

/// Formats hour keys ("09:00", "Monday 09:00") in 12-hour style; weekday
/// keys pass through unchanged.
fn format_time_label(key: &str) -> String {
    match key.rsplit_once(' ') {
        Some((prefix, hour_part)) => match parse_hour(hour_part) {
            Some(hour) => format!("{} {}", prefix, hour_12(hour)),
            None => key.to_string(),
        },
        None => match parse_hour(key) {
            Some(hour) => hour_12(hour),
            None => key.to_string(),
        },
    }
}

fn parse_hour(s: &str) -> Option<u32> {
    let hour = s.strip_suffix(":00")?.parse::<u32>().ok()?;
    (hour < 24).then_some(hour)
}

fn hour_12(hour: u32) -> String {
    if hour < 12 {
        format!("{}:00 AM", hour)
    } else if hour == 12 {
        "12:00 PM".to_string()
    } else {
        format!("{}:00 PM", hour - 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::TimeGranularity;

    fn stat(key: &str, mean: f64, count: usize) -> GroupStat {
        GroupStat {
            key: key.to_string(),
            mean_score: mean,
            sample_count: count,
        }
    }

    fn report_with(time_ranking: Vec<GroupStat>) -> EngagementReport {
        EngagementReport {
            content_type_ranking: vec![stat("image", 54.0, 1), stat("text", 23.0, 1)],
            topic_ranking: vec![],
            length_ranking: vec![stat("0-50", 38.5, 2)],
            time_ranking,
            top_hashtags: vec![],
            overall_mean_score: 38.5,
            analyzed_posts: 2,
            time_granularity: TimeGranularity::Hour,
        }
    }

    #[test]
    fn test_preserves_analyzer_ordering_and_values() {
        let view = InsightPresenter::present(&report_with(vec![]));
        let types = &view.sections[0];
        assert_eq!(types.rows[0].label, "image");
        assert_eq!(types.rows[0].mean_score, 54.0);
        assert_eq!(types.rows[1].label, "text");
        assert_eq!(types.rows[1].mean_score, 23.0);
        assert_eq!(view.total_posts, 2);
    }

    #[test]
    fn test_best_time_formatting() {
        let view = InsightPresenter::present(&report_with(vec![stat("09:00", 90.0, 3)]));
        assert_eq!(view.best_posting_time, "9:00 AM");

        let view = InsightPresenter::present(&report_with(vec![stat("12:00", 90.0, 3)]));
        assert_eq!(view.best_posting_time, "12:00 PM");

        let view = InsightPresenter::present(&report_with(vec![stat("15:00", 90.0, 3)]));
        assert_eq!(view.best_posting_time, "3:00 PM");

        let view = InsightPresenter::present(&report_with(vec![stat("Monday 09:00", 90.0, 3)]));
        assert_eq!(view.best_posting_time, "Monday 9:00 AM");

        let view = InsightPresenter::present(&report_with(vec![stat("Monday", 90.0, 3)]));
        assert_eq!(view.best_posting_time, "Monday");
    }

    #[test]
    fn test_empty_time_ranking_is_a_message_not_an_error() {
        let view = InsightPresenter::present(&report_with(vec![]));
        assert_eq!(view.best_posting_time, NO_TIME_DATA);
        assert!(view.sections[3].rows.is_empty());
    }

    #[test]
    fn test_observation_thresholds() {
        // overall mean is 38.5: image at 54.0 is > 1.2x, text at 23.0 is < 0.8x
        let view = InsightPresenter::present(&report_with(vec![]));
        let types = &view.sections[0];
        assert!(types.rows[0]
            .observation
            .as_deref()
            .unwrap()
            .starts_with("High engagement"));
        assert!(types.rows[1]
            .observation
            .as_deref()
            .unwrap()
            .starts_with("Low engagement"));
    }
}
