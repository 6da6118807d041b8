//! Typed assistant profiles.
//!
//! Each mode lists one or more JSON files. `$app_name` / `$bot_name`
//! placeholders are substituted, the files are merged left to right at the
//! top level, and the result is validated into a [`BotProfile`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{AppConfig, ConfigError};

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if s.is_empty() => vec![],
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => vec![],
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// How a user reaches the application.
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevTeam {
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    #[serde(default, deserialize_with = "one_or_many")]
    pub tone: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub quirks: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub likes: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub dislikes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Writing {
    #[serde(default)]
    pub format: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    #[serde(default, deserialize_with = "one_or_many")]
    pub engagement: Vec<String>,
    #[serde(default)]
    pub writing: Writing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseLogic {
    #[serde(default)]
    pub knowledge_scope: String,
    #[serde(default)]
    pub assumed_user_knowledge: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub behavior: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub opinion_policy: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub off_topic: Vec<String>,
}

/// Response logic is either given directly or keyed per mode as `<mode>_queries`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseLogicSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_queries: Option<ResponseLogic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_queries: Option<ResponseLogic>,
    #[serde(flatten)]
    pub general: ResponseLogic,
}

impl ResponseLogicSection {
    /// The logic for `mode` ("app", "technical", "persona"), falling back to the direct form.
    pub fn for_mode(&self, mode: &str) -> &ResponseLogic {
        let keyed = match mode {
            "app" => self.app_queries.as_ref(),
            "technical" => self.technical_queries.as_ref(),
            _ => None,
        };
        keyed.unwrap_or(&self.general)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub length_limit: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub formatting: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyAndEthics {
    #[serde(default, deserialize_with = "one_or_many")]
    pub bias_avoidance: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub language: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCaveats {
    #[serde(default, deserialize_with = "one_or_many")]
    pub app_and_chatbot_status: Vec<String>,
    /// Diagram name → availability note.
    #[serde(default)]
    pub diagram_status: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Access {
    #[serde(default, deserialize_with = "one_or_many")]
    pub ontology_data: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub graph_interactions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    #[serde(default, deserialize_with = "one_or_many")]
    pub method: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    #[serde(default)]
    pub safety_and_ethics: SafetyAndEthics,
    #[serde(default)]
    pub project_caveats: ProjectCaveats,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub escalation: Escalation,
    #[serde(default, deserialize_with = "one_or_many")]
    pub narratives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Favorites {
    #[serde(default, deserialize_with = "one_or_many")]
    pub colors: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub fruits: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub beverages: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub foods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interests {
    #[serde(default, deserialize_with = "one_or_many")]
    pub science: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub sports: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub hobbies: Vec<String>,
}

/// A fully merged assistant profile for one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotProfile {
    pub name: String,
    pub role: String,
    pub app: AppInfo,

    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub profile_type: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub notes: Vec<String>,
    #[serde(default)]
    pub dev_team: DevTeam,
    #[serde(default)]
    pub personality: Personality,
    #[serde(default)]
    pub style_guide: StyleGuide,
    #[serde(default)]
    pub response_logic: ResponseLogicSection,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub boundaries: Boundaries,

    // Personal details, rendered in persona mode only.
    #[serde(default)]
    pub appearance: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives_with: Option<String>,
    #[serde(default)]
    pub favorites: Favorites,
    #[serde(default)]
    pub interests: Interests,
}

impl BotProfile {
    /// The built-in profile used when a mode lists no profile files.
    pub fn minimal(bot_name: &str, app_name: &str) -> Self {
        Self {
            name: bot_name.to_string(),
            role: format!("the assistant for {app_name}"),
            app: AppInfo {
                name: app_name.to_string(),
                description: "knowledge application".into(),
                location: "asking the assistant".into(),
            },
            office: String::new(),
            gender: String::new(),
            profile_type: "helpful".into(),
            notes: vec![],
            dev_team: DevTeam::default(),
            personality: Personality::default(),
            style_guide: StyleGuide::default(),
            response_logic: ResponseLogicSection::default(),
            response_format: ResponseFormat::default(),
            boundaries: Boundaries::default(),
            appearance: BTreeMap::new(),
            birthday: None,
            relationship_status: None,
            home: None,
            lives_with: None,
            favorites: Favorites::default(),
            interests: Interests::default(),
        }
    }

    /// Load and merge profile files for one mode.
    pub fn load_merged(
        dir: &Path,
        files: &[String],
        bot_name: &str,
        app_name: &str,
    ) -> Result<Self, ConfigError> {
        let mut merged = serde_json::Map::new();
        let mut last_path = dir.to_path_buf();

        for file in files.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
            let path = dir.join(file);
            let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::ProfileError {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let content = substitute(&raw, bot_name, app_name);

            match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(serde_json::Value::Object(obj)) => merged.extend(obj),
                Ok(_) => {
                    return Err(ConfigError::ProfileError {
                        path,
                        reason: "profile must be a JSON object".into(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::ProfileError {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
            last_path = path;
        }

        serde_json::from_value(serde_json::Value::Object(merged)).map_err(|e| {
            ConfigError::ProfileError {
                path: last_path,
                reason: e.to_string(),
            }
        })
    }
}

/// Replace `$app_name` / `$bot_name` (and their `${...}` forms).
fn substitute(template: &str, bot_name: &str, app_name: &str) -> String {
    template
        .replace("${app_name}", app_name)
        .replace("${bot_name}", bot_name)
        .replace("$app_name", app_name)
        .replace("$bot_name", bot_name)
}

/// The three per-mode profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSet {
    pub app: BotProfile,
    pub technical: BotProfile,
    pub persona: BotProfile,
}

impl ProfileSet {
    /// Load every mode's profile as configured.
    pub fn load(config: &AppConfig) -> Result<Self, ConfigError> {
        let dir = config
            .profiles
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let bot = &config.bot;

        let load_mode = |files: &[String]| -> Result<BotProfile, ConfigError> {
            if files.iter().all(|f| f.trim().is_empty()) {
                Ok(BotProfile::minimal(&bot.name, &bot.app_name))
            } else {
                BotProfile::load_merged(&dir, files, &bot.name, &bot.app_name)
            }
        };

        Ok(Self {
            app: load_mode(&config.profiles.app)?,
            technical: load_mode(&config.profiles.technical)?,
            persona: load_mode(&config.profiles.persona)?,
        })
    }

    /// Built-in profiles for every mode.
    pub fn minimal(bot_name: &str, app_name: &str) -> Self {
        let profile = BotProfile::minimal(bot_name, app_name);
        Self {
            app: profile.clone(),
            technical: profile.clone(),
            persona: profile,
        }
    }
}
