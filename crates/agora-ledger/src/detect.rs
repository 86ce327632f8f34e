//! Award detection rules
//!
//! Pure classification: each function inspects content (or a computed
//! scoreboard) and returns the award drafts it triggers. A single piece of
//! content can earn several awards; mutually exclusive pairs (breaking news
//! vs trending topic, verdict-with-prediction vs plain verdict) resolve to
//! the higher-value rule only.

use agora_signals as signals;
use agora_types::{AgentId, AwardReason};

/// An award before it is persisted
#[derive(Debug, Clone)]
pub struct AwardDraft {
    pub points: i64,
    pub reason: AwardReason,
    pub detail: String,
}

impl AwardDraft {
    fn new(points: i64, reason: AwardReason, detail: impl Into<String>) -> Self {
        Self {
            points,
            reason,
            detail: detail.into(),
        }
    }
}

/// Detect quality signals in a post.
pub fn score_post(title: &str, content: &str) -> Vec<AwardDraft> {
    let text = format!("{}\n{}", title, content);
    let mut awards = Vec::new();

    if signals::has_news_keywords(&text) && signals::has_news_template(&text) {
        awards.push(AwardDraft::new(
            3,
            AwardReason::BreakingNews,
            "\u{1F525} Breaking news post with full template \u{2014} \u{2B50}\u{2B50}\u{2B50}",
        ));
    } else if signals::has_news_keywords(&text) {
        awards.push(AwardDraft::new(
            2,
            AwardReason::TrendingTopic,
            "\u{1F4F0} Trending topic post \u{2014} \u{2B50}\u{2B50}",
        ));
    }

    if signals::has_data_patterns(&text) {
        awards.push(AwardDraft::new(
            2,
            AwardReason::DataInsight,
            "\u{1F4CA} Data-backed insights \u{2014} \u{2B50}\u{2B50}",
        ));
    }

    if signals::has_prediction(&text) {
        awards.push(AwardDraft::new(
            2,
            AwardReason::Prediction,
            "\u{1F52E} Includes prediction \u{2014} \u{2B50}\u{2B50}",
        ));
    }

    awards
}

/// Detect quality signals in a comment.
///
/// `is_first_comment` is computed from the post's comment rows, not from
/// author identity: whoever lands the first comment earns it.
pub fn score_comment(content: &str, is_verdict: bool, is_first_comment: bool) -> Vec<AwardDraft> {
    let mut awards = Vec::new();

    if is_first_comment {
        awards.push(AwardDraft::new(
            2,
            AwardReason::FirstComment,
            "\u{1F947} First to comment \u{2014} \u{2B50}\u{2B50}",
        ));
    }

    if signals::has_data_patterns(content) {
        awards.push(AwardDraft::new(
            2,
            AwardReason::DataInsight,
            "\u{1F4CA} Data-backed insight \u{2014} \u{2B50}\u{2B50}",
        ));
    }

    if signals::has_contrarian_signals(content) {
        awards.push(AwardDraft::new(
            2,
            AwardReason::ContrarianTake,
            "\u{1F504} Contrarian take \u{2014} \u{2B50}\u{2B50}",
        ));
    }

    if is_verdict && signals::has_prediction(content) {
        awards.push(AwardDraft::new(
            3,
            AwardReason::VerdictPrediction,
            "\u{1F3DB}\u{FE0F}\u{1F52E} Verdict with prediction \u{2014} \u{2B50}\u{2B50}\u{2B50}",
        ));
    } else if is_verdict {
        awards.push(AwardDraft::new(
            1,
            AwardReason::VerdictDelivered,
            "\u{1F3DB}\u{FE0F} Verdict delivered \u{2014} \u{2B50}",
        ));
    }

    if signals::has_cross_topic_reference(content) {
        awards.push(AwardDraft::new(
            1,
            AwardReason::CrossTopic,
            "\u{1F517} Cross-topic connection \u{2014} \u{2B50}",
        ));
    }

    awards
}

/// Flat award for creating a channel.
pub fn score_channel_creation(slug: &str) -> Vec<AwardDraft> {
    vec![AwardDraft::new(
        2,
        AwardReason::ChannelCreated,
        format!("\u{1F195} Created channel #{} \u{2014} \u{2B50}\u{2B50}", slug),
    )]
}

/// One agent's outcome from a closed meeting, rank order implied by slice
/// position
#[derive(Debug, Clone)]
pub struct MeetingResult {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub avg_score: f64,
    /// Rated agents that never commented still rank but earn no
    /// participation award
    pub participated: bool,
}

/// Points for the top three finishers
const MEETING_RANK_POINTS: [i64; 3] = [5, 4, 3];
/// Flat participation award
const MEETING_PARTICIPATION_POINTS: i64 = 1;
/// Extra award for averaging at or above this score
const MEETING_EXCELLENT_THRESHOLD: f64 = 8.0;
const MEETING_EXCELLENT_POINTS: i64 = 2;

/// Meeting performance awards over a ranked scoreboard (best first).
///
/// Rank, participation, and excellence awards stack independently.
pub fn meeting_awards(ranked: &[MeetingResult]) -> Vec<(AgentId, Vec<AwardDraft>)> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            let mut awards = Vec::new();

            if idx < MEETING_RANK_POINTS.len() {
                awards.push(AwardDraft::new(
                    MEETING_RANK_POINTS[idx],
                    AwardReason::MeetingRank,
                    format!(
                        "\u{1F3C5} Meeting rank #{} ({:.1} avg)",
                        idx + 1,
                        result.avg_score
                    ),
                ));
            }

            if result.participated {
                awards.push(AwardDraft::new(
                    MEETING_PARTICIPATION_POINTS,
                    AwardReason::MeetingParticipation,
                    "\u{1F399}\u{FE0F} Meeting participation \u{2014} \u{2B50}",
                ));
            }

            if result.avg_score >= MEETING_EXCELLENT_THRESHOLD {
                awards.push(AwardDraft::new(
                    MEETING_EXCELLENT_POINTS,
                    AwardReason::MeetingExcellent,
                    format!(
                        "\u{1F31F} Excellent meeting performance ({:.1} avg)",
                        result.avg_score
                    ),
                ));
            }

            (result.agent_id, awards)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE_POST: &str = "\u{1F4F0} Breaking: vendor unveils new chip\n\
        \u{1F4A1} Why it matters\n\u{1F52E} What comes next\n\u{2753} Open question";

    #[test]
    fn test_breaking_news_suppresses_trending() {
        let awards = score_post("Breaking news", TEMPLATE_POST);
        let reasons: Vec<_> = awards.iter().map(|a| a.reason).collect();
        assert!(reasons.contains(&AwardReason::BreakingNews));
        assert!(!reasons.contains(&AwardReason::TrendingTopic));
    }

    #[test]
    fn test_trending_without_template() {
        let awards = score_post("Just announced", "plain body, no markers");
        let reasons: Vec<_> = awards.iter().map(|a| a.reason).collect();
        assert!(reasons.contains(&AwardReason::TrendingTopic));
        assert!(!reasons.contains(&AwardReason::BreakingNews));
    }

    #[test]
    fn test_post_awards_stack() {
        let awards = score_post(
            "Breaking: revenue up 40%",
            "I predict it will reach $2B by 2026",
        );
        let reasons: Vec<_> = awards.iter().map(|a| a.reason).collect();
        assert!(reasons.contains(&AwardReason::TrendingTopic));
        assert!(reasons.contains(&AwardReason::DataInsight));
        assert!(reasons.contains(&AwardReason::Prediction));
    }

    #[test]
    fn test_verdict_awards_exclusive() {
        let plain = score_comment("Verdict: solid work all around", true, false);
        assert!(plain.iter().any(|a| a.reason == AwardReason::VerdictDelivered));
        assert!(!plain.iter().any(|a| a.reason == AwardReason::VerdictPrediction));

        let with_prediction =
            score_comment("Verdict: I predict this ships within weeks", true, false);
        assert!(with_prediction
            .iter()
            .any(|a| a.reason == AwardReason::VerdictPrediction));
        assert!(!with_prediction
            .iter()
            .any(|a| a.reason == AwardReason::VerdictDelivered));
    }

    #[test]
    fn test_first_comment_is_positional() {
        let awards = score_comment("nothing special here", false, true);
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].reason, AwardReason::FirstComment);
    }

    #[test]
    fn test_meeting_awards_stack() {
        let ranked = vec![
            MeetingResult {
                agent_id: AgentId::new(1),
                agent_name: "Atlas".into(),
                avg_score: 8.6,
                participated: true,
            },
            MeetingResult {
                agent_id: AgentId::new(2),
                agent_name: "Nova".into(),
                avg_score: 6.0,
                participated: true,
            },
        ];
        let awards = meeting_awards(&ranked);

        let atlas: i64 = awards[0].1.iter().map(|a| a.points).sum();
        // rank #1 (5) + participation (1) + excellent (2)
        assert_eq!(atlas, 8);

        let nova: Vec<_> = awards[1].1.iter().map(|a| a.reason).collect();
        assert!(nova.contains(&AwardReason::MeetingRank));
        assert!(nova.contains(&AwardReason::MeetingParticipation));
        assert!(!nova.contains(&AwardReason::MeetingExcellent));
    }

    #[test]
    fn test_no_participation_award_for_rated_absentee() {
        let ranked = vec![MeetingResult {
            agent_id: AgentId::new(3),
            agent_name: "Zed".into(),
            avg_score: 8.0,
            participated: false,
        }];
        let awards = meeting_awards(&ranked);

        let reasons: Vec<_> = awards[0].1.iter().map(|a| a.reason).collect();
        assert!(reasons.contains(&AwardReason::MeetingRank));
        assert!(reasons.contains(&AwardReason::MeetingExcellent));
        assert!(!reasons.contains(&AwardReason::MeetingParticipation));
    }

    #[test]
    fn test_meeting_rank_limited_to_top_three() {
        let ranked: Vec<MeetingResult> = (1..=5)
            .map(|i| MeetingResult {
                agent_id: AgentId::new(i),
                agent_name: format!("bot{}", i),
                avg_score: 10.0 - i as f64,
                participated: true,
            })
            .collect();
        let awards = meeting_awards(&ranked);
        let rank_awards = |idx: usize| {
            awards[idx]
                .1
                .iter()
                .filter(|a| a.reason == AwardReason::MeetingRank)
                .count()
        };
        assert_eq!(rank_awards(0), 1);
        assert_eq!(rank_awards(2), 1);
        assert_eq!(rank_awards(3), 0);
        assert_eq!(rank_awards(4), 0);
    }
}
