//! Site owner profile: the preamble that frames the first turn, the welcome
//! panel copy, and the suggested questions.

use std::path::Path;

use serde::Deserialize;

use crate::error::{FolioError, Result};

const BUILTIN_PROFILE: &str = include_str!("../../assets/profile.toml");

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Whose portfolio this is.
    pub owner: String,
    /// Link to the downloadable resume.
    #[serde(default)]
    pub resume: Option<String>,
    pub greeting: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    pub preamble: String,
}

impl Profile {
    /// The profile shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_PROFILE)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut profile: Profile = toml::from_str(raw)?;
        profile.preamble = profile.preamble.trim().to_string();
        if profile.preamble.is_empty() {
            return Err(FolioError::Configuration(
                "profile preamble must not be empty".to_string(),
            ));
        }
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FolioError::Configuration(format!("cannot read profile {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Static panel shown while the transcript is empty.
    pub fn welcome_panel(&self) -> WelcomePanel {
        WelcomePanel {
            greeting: self.greeting.clone(),
            topics: self.topics.clone(),
            suggested_questions: self.suggested_questions.clone(),
        }
    }
}

/// Welcome copy plus the suggested-question shortcuts.
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomePanel {
    pub greeting: String,
    pub topics: Vec<String>,
    pub suggested_questions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profile_parses() {
        let profile = Profile::builtin().unwrap();
        assert_eq!(profile.owner, "Divax Shah");
        assert_eq!(profile.suggested_questions.len(), 5);
        assert_eq!(profile.topics.len(), 4);
        assert!(profile.preamble.starts_with("You are Divax Shah's personal AI assistant"));
        assert!(profile.preamble.contains("QuizWiz (https://huggingface.co/spaces/diabolic6045/QuizWiz)"));
    }

    #[test]
    fn preamble_is_trimmed() {
        let profile = Profile::from_toml_str(
            "owner = \"A\"\ngreeting = \"hi\"\npreamble = '''\n  be nice  \n'''\n",
        )
        .unwrap();
        assert_eq!(profile.preamble, "be nice");
        assert!(profile.suggested_questions.is_empty());
    }

    #[test]
    fn blank_preamble_is_rejected() {
        let err = Profile::from_toml_str("owner = \"A\"\ngreeting = \"hi\"\npreamble = \"  \"\n")
            .unwrap_err();
        assert!(matches!(err, FolioError::Configuration(_)));
    }

    #[test]
    fn welcome_panel_mirrors_profile() {
        let profile = Profile::builtin().unwrap();
        let panel = profile.welcome_panel();
        assert_eq!(panel.greeting, profile.greeting);
        assert_eq!(panel.suggested_questions, profile.suggested_questions);
    }
}
