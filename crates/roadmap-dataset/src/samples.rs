//! Bundled sample datasets
//!
//! Used by tests, the simulator and the CLI when no dataset file is given.

use crate::dataset::{Dataset, Goal, SkillSpec};

/// Goal id of the frontend track
pub const FRONTEND: &str = "frontend";
/// Goal id of the backend track
pub const BACKEND: &str = "backend";
/// Goal id of the devops track
pub const DEVOPS: &str = "devops";

/// Three-level frontend goal: HTML(1) -> CSS(2) -> JavaScript(3)
#[must_use]
pub fn frontend_goal() -> Goal {
    Goal::new(FRONTEND, "Frontend Developer")
        .with_skill("HTML", SkillSpec::new(1).with_tools(["VS Code"]))
        .with_skill("CSS", SkillSpec::new(2).with_tools(["Sass", "Tailwind"]))
        .with_skill("JavaScript", SkillSpec::new(3).with_tools(["TypeScript"]))
}

/// Dataset with only the frontend goal
#[must_use]
pub fn frontend() -> Dataset {
    // Static content, validated by tests.
    Dataset::from_goals([frontend_goal()]).unwrap_or_default()
}

/// Backend goal sharing `Git` and `HTML` with the other tracks
#[must_use]
pub fn backend_goal() -> Goal {
    Goal::new(BACKEND, "Backend Developer")
        .with_skill("Git", SkillSpec::new(1).with_tools(["GitHub"]))
        .with_skill("HTML", SkillSpec::new(1))
        .with_skill("SQL", SkillSpec::new(2).with_tools(["PostgreSQL", "SQLite"]))
        .with_skill("HTTP", SkillSpec::new(2))
        .with_skill("Rust", SkillSpec::new(3).with_tools(["Cargo"]))
        .with_skill("Distributed Systems", SkillSpec::new(5))
}

/// DevOps goal sharing `Git` with the backend track
#[must_use]
pub fn devops_goal() -> Goal {
    Goal::new(DEVOPS, "DevOps Engineer")
        .with_skill("Linux", SkillSpec::new(1).with_tools(["Bash"]))
        .with_skill("Git", SkillSpec::new(2).with_tools(["GitHub", "GitLab"]))
        .with_skill("Docker", SkillSpec::new(3).with_tools(["Compose"]))
        .with_skill("Kubernetes", SkillSpec::new(4).with_tools(["Helm", "kubectl"]))
}

/// Frontend, backend and devops goals with overlapping skills
#[must_use]
pub fn career_tracks() -> Dataset {
    let frontend = frontend_goal().with_skill("Git", SkillSpec::new(1).with_tools(["GitHub"]));
    Dataset::from_goals([frontend, backend_goal(), devops_goal()]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoalId;

    #[test]
    fn bundled_datasets_are_valid() {
        assert_eq!(frontend().len(), 1);
        assert_eq!(career_tracks().len(), 3);
        assert!(Dataset::from_goals([frontend_goal(), backend_goal(), devops_goal()]).is_ok());
    }

    #[test]
    fn git_is_shared_across_tracks() {
        let dataset = career_tracks();
        let ids: Vec<_> = dataset.goals_with_skill("Git").into_iter().cloned().collect();
        assert_eq!(
            ids,
            vec![GoalId::from(FRONTEND), GoalId::from(BACKEND), GoalId::from(DEVOPS)]
        );
    }
}
