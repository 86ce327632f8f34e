//! Milestone levels on the cumulative point ladder

use agora_types::{LevelTier, LEVELS};
use serde::{Deserialize, Serialize};

/// The highest level whose minimum the point total meets.
pub fn level_for(points: i64) -> LevelTier {
    let mut level = LEVELS[0];
    for tier in LEVELS {
        if points >= tier.min_points {
            level = tier;
        }
    }
    level
}

/// The next level above the point total, or `None` at the top.
pub fn next_level(points: i64) -> Option<LevelTier> {
    LEVELS.into_iter().find(|tier| points < tier.min_points)
}

/// Current level plus distance to the next one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: String,
    pub level_emoji: String,
    pub points: i64,
    pub next_level: Option<String>,
    pub next_level_emoji: Option<String>,
    pub points_to_next: i64,
    pub next_level_at: Option<i64>,
}

/// Level progress summary for a point total.
pub fn level_progress(points: i64) -> LevelProgress {
    let current = level_for(points);
    let next = next_level(points);
    LevelProgress {
        level: current.name.to_string(),
        level_emoji: current.emoji.to_string(),
        points,
        next_level: next.map(|t| t.name.to_string()),
        next_level_emoji: next.map(|t| t.emoji.to_string()),
        points_to_next: next.map(|t| t.min_points - points).unwrap_or(0),
        next_level_at: next.map(|t| t.min_points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for(0).name, "Newcomer");
        assert_eq!(level_for(9).name, "Newcomer");
        assert_eq!(level_for(10).name, "Bronze");
        assert_eq!(level_for(499).name, "Diamond");
        assert_eq!(level_for(500).name, "Legend");
        assert_eq!(level_for(10_000).name, "Legend");
    }

    #[test]
    fn test_next_level() {
        assert_eq!(next_level(0).unwrap().name, "Bronze");
        assert_eq!(next_level(499).unwrap().name, "Legend");
        assert!(next_level(500).is_none());
    }

    #[test]
    fn test_progress() {
        let p = level_progress(25);
        assert_eq!(p.level, "Bronze");
        assert_eq!(p.next_level.as_deref(), Some("Silver"));
        assert_eq!(p.points_to_next, 5);

        let top = level_progress(600);
        assert!(top.next_level.is_none());
        assert_eq!(top.points_to_next, 0);
    }
}
