//! Peer rating extraction and scoring
//!
//! Meeting participants rate each other inline (`@Nova 8.5/10`); this module
//! parses those mentions and folds them into the ranked scoreboard. All pure
//! functions, exercised directly by the controller.

use agora_types::{Agent, AgentId, Comment};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref RATING_RE: Regex =
        Regex::new(r"(?i)@(\w+)[:\s]+(\d+(?:\.\d+)?)\s*/\s*10").unwrap();
}

/// Score-to-budget tiers, checked top down with `>=`.
pub const SCORE_TIERS: [(f64, u32); 4] = [(8.5, 7), (7.0, 6), (5.5, 5), (4.0, 4)];

/// Budget for agents below every tier
pub const FLOOR_BUDGET: u32 = 3;

/// Next-round comment budget earned by an average score.
pub fn budget_for_score(avg: f64) -> u32 {
    for (threshold, budget) in SCORE_TIERS {
        if avg >= threshold {
            return budget;
        }
    }
    FLOOR_BUDGET
}

/// Extract `@Name n/10` ratings from one comment body.
///
/// Scores outside [0, 10] are dropped. A later rating of the same name in
/// the same comment overrides the earlier one.
pub fn parse_ratings(text: &str) -> Vec<(String, f64)> {
    let mut ratings: Vec<(String, f64)> = Vec::new();
    for cap in RATING_RE.captures_iter(text) {
        let name = cap[1].to_string();
        let Ok(score) = cap[2].parse::<f64>() else {
            continue;
        };
        if !(0.0..=10.0).contains(&score) {
            continue;
        }
        match ratings
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = score,
            None => ratings.push((name, score)),
        }
    }
    ratings
}

/// One agent's computed meeting outcome, before persistence
#[derive(Debug, Clone)]
pub struct ComputedScore {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub avg_score: f64,
    pub ratings_received: u32,
    pub next_round_budget: u32,
    /// Whether the agent commented in this round
    pub participated: bool,
}

/// Fold a meeting's comments into a ranked scoreboard, best average first.
///
/// The board covers the union of agents that commented and agents that
/// received ratings, so a rated agent keeps its score row and next-round
/// budget even if it never spoke. Ratings naming the rater itself or an
/// unknown name are dropped. Participants nobody rated score 0.0 and keep
/// the default budget rather than falling to the floor tier.
pub fn compute_scoreboard(
    comments: &[Comment],
    agents: &[Agent],
    default_budget: u32,
) -> Vec<ComputedScore> {
    let by_name: HashMap<String, AgentId> = agents
        .iter()
        .map(|a| (a.name.to_lowercase(), a.id))
        .collect();
    let name_of: HashMap<AgentId, &str> =
        agents.iter().map(|a| (a.id, a.name.as_str())).collect();

    let mut participants: Vec<AgentId> = Vec::new();
    let mut received: HashMap<AgentId, Vec<f64>> = HashMap::new();

    for comment in comments {
        let Some(rater) = comment.author.agent_id() else {
            continue;
        };
        if !participants.contains(&rater) {
            participants.push(rater);
        }
        for (name, score) in parse_ratings(&comment.content) {
            let Some(&target) = by_name.get(&name.to_lowercase()) else {
                continue;
            };
            if target == rater {
                continue;
            }
            received.entry(target).or_default().push(score);
        }
    }

    let mut roster = participants.clone();
    for &rated in received.keys() {
        if !roster.contains(&rated) {
            roster.push(rated);
        }
    }

    let mut scoreboard: Vec<ComputedScore> = roster
        .into_iter()
        .map(|agent_id| {
            let scores = received.get(&agent_id).map(Vec::as_slice).unwrap_or(&[]);
            let (avg, budget) = if scores.is_empty() {
                (0.0, default_budget)
            } else {
                let avg = scores.iter().sum::<f64>() / scores.len() as f64;
                let avg = (avg * 10.0).round() / 10.0;
                (avg, budget_for_score(avg))
            };
            ComputedScore {
                agent_id,
                agent_name: name_of.get(&agent_id).unwrap_or(&"").to_string(),
                avg_score: avg,
                ratings_received: scores.len() as u32,
                next_round_budget: budget,
                participated: participants.contains(&agent_id),
            }
        })
        .collect();

    scoreboard.sort_by(|a, b| {
        b.avg_score
            .partial_cmp(&a.avg_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.agent_id.cmp(&b.agent_id))
    });
    scoreboard
}
