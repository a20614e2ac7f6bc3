use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Voice register a companion speaks in. Written into generation prompts in
/// its lowercase wire form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tone {
    Warm,
    Playful,
    Grounded,
    Direct,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Visibility {
    Private,
    Friends,
    Public,
}

/// A configured companion identity. Immutable once created except by explicit
/// update (not exposed beyond create/read).
///
/// Wire form uses camelCase (`createdAt`) to match the public API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionProfile {
    pub id: String,
    pub name: String,
    pub archetype: String,
    pub tone: Tone,
    /// Ordered behavioral constraints, injected into generation prompts.
    pub boundaries: Vec<String>,
    pub bio: String,
    pub visibility: Visibility,
    pub created_at: String,
}

/// Request-supplied fields for companion creation.
#[derive(Debug, Clone)]
pub struct NewCompanion {
    pub name: String,
    pub archetype: String,
    pub tone: Tone,
    pub boundaries: Vec<String>,
    pub bio: String,
    pub visibility: Visibility,
}

impl NewCompanion {
    /// Creation defaults for a companion known only by name (e.g. named in a
    /// chat request without a matching profile).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archetype: "Custom companion".into(),
            tone: Tone::Warm,
            boundaries: vec!["No harmful content".into()],
            bio: "Custom companion profile".into(),
            visibility: Visibility::Private,
        }
    }
}

impl CompanionProfile {
    /// Materialize a profile from creation fields, assigning id and timestamp.
    pub fn create(new: NewCompanion) -> Self {
        Self {
            id: format!("comp-{}", Uuid::new_v4()),
            name: new.name,
            archetype: new.archetype,
            tone: new.tone,
            boundaries: new.boundaries,
            bio: new.bio,
            visibility: new.visibility,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Built-in sample profiles served when no durable store is configured (and
/// to users who have not created companions of their own yet).
pub fn sample_companions() -> Vec<CompanionProfile> {
    let created_at = Utc::now().to_rfc3339();
    vec![
        CompanionProfile {
            id: "comp-001".into(),
            name: "Ari".into(),
            archetype: "Thoughtful encourager".into(),
            tone: Tone::Warm,
            boundaries: vec!["No sexual roleplay".into(), "No manipulative behavior".into()],
            bio: "A calm, supportive companion who helps users process goals and emotions.".into(),
            visibility: Visibility::Public,
            created_at: created_at.clone(),
        },
        CompanionProfile {
            id: "comp-002".into(),
            name: "Nova".into(),
            archetype: "Curious co-pilot".into(),
            tone: Tone::Playful,
            boundaries: vec!["No harassment".into(), "No self-harm reinforcement".into()],
            bio: "A creative buddy for brainstorming, reflection, and daily check-ins.".into(),
            visibility: Visibility::Friends,
            created_at,
        },
    ]
}

/// Resolve a profile for stateless chat: sample by id, then by name
/// (case-insensitive), else a default profile carrying the requested name.
pub fn resolve_sample(companion_id: Option<&str>, companion_name: Option<&str>) -> CompanionProfile {
    let samples = sample_companions();

    if let Some(id) = companion_id {
        if let Some(profile) = samples.iter().find(|c| c.id == id) {
            return profile.clone();
        }
    }
    if let Some(name) = companion_name {
        if let Some(profile) = samples.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
            return profile.clone();
        }
    }

    CompanionProfile::create(NewCompanion::named(
        companion_name.unwrap_or("Your companion"),
    ))
}
