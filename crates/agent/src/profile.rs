//! Assistant profile rendering.
//!
//! Turns a typed [`BotProfile`] into the `### Assistant_Profile` preamble that
//! is sent ahead of the composed user prompt.

use parley_config::profile::{BotProfile, Boundaries, ProfileSet, ResponseFormat, ResponseLogic, StyleGuide};
use std::fmt::Write as _;

use crate::mode::Mode;

pub const PROFILE_HEADING: &str = "### Assistant_Profile";

pub fn profile_for(profiles: &ProfileSet, mode: Mode) -> &BotProfile {
    match mode {
        Mode::App => &profiles.app,
        Mode::Technical => &profiles.technical,
        Mode::Persona => &profiles.persona,
    }
}

/// The full preamble for `mode`.
pub fn render_profile(profile: &BotProfile, mode: Mode) -> String {
    let body = match mode {
        Mode::App | Mode::Technical => render_work_profile(profile, mode),
        Mode::Persona => render_persona_profile(profile),
    };
    format!("{PROFILE_HEADING}\n{body}")
}

/// Prefix the preamble to a composed prompt.
pub fn with_profile(preamble: &str, prompt: &str) -> String {
    format!("{preamble}\n\n{prompt}")
}

fn render_work_profile(profile: &BotProfile, mode: Mode) -> String {
    let personality = &profile.personality;
    format!(
        "{core}

Tone and demeanor:
{tone}
{engagement}

You may reflect the following traits if relevant:
{quirks}
{likes}

Do not express or imply the following:
{dislikes}

{logic}

{format}
{style}

Operational boundaries to observe:
{operational}

Narrative boundaries to observe:
{narrative}",
        core = render_core(profile, mode),
        tone = bullets(&personality.tone),
        engagement = bullets(&profile.style_guide.engagement),
        quirks = bullets(&personality.quirks),
        likes = bullets(&personality.likes),
        dislikes = bullets(&personality.dislikes),
        logic = render_response_logic(profile.response_logic.for_mode(mode.as_str())),
        format = render_response_format(&profile.response_format),
        style = render_style_guide(&profile.style_guide),
        operational = render_operational_boundaries(&profile.boundaries),
        narrative = bullets(&profile.boundaries.narratives),
    )
}

fn render_persona_profile(profile: &BotProfile) -> String {
    let personality = &profile.personality;
    format!(
        "{core}
{personal}

Tone and demeanor:
{tone}
{engagement}

You may exhibit the following personality traits:
{quirks}

You like:
{likes}

You tend to avoid:
{dislikes}

{logic}

{format}{style}

Operational boundaries to observe:
{operational}

Narrative boundaries to observe:
{narrative}",
        core = render_core(profile, Mode::Persona),
        personal = render_personal_information(profile),
        tone = bullets(&personality.tone),
        engagement = bullets(&profile.style_guide.engagement),
        quirks = bullets(&personality.quirks),
        likes = bullets(&personality.likes),
        dislikes = bullets(&personality.dislikes),
        logic = render_response_logic(profile.response_logic.for_mode(Mode::Persona.as_str())),
        format = render_response_format(&profile.response_format),
        style = render_style_guide(&profile.style_guide),
        operational = render_operational_boundaries(&profile.boundaries),
        narrative = bullets(&profile.boundaries.narratives),
    )
}

fn render_core(profile: &BotProfile, mode: Mode) -> String {
    let app = &profile.app;
    let capacity = &profile.profile_type;
    let responsibility = match mode {
        Mode::App => format!(
            "You are responding to user queries relating to {} in a {capacity} capacity.",
            app.name
        ),
        Mode::Technical => {
            format!("You are sharing your technical know-how with the user in a {capacity} capacity.")
        }
        Mode::Persona => {
            format!("However, you are taking a break to engage in light banter with the user in a {capacity} way.")
        }
    };

    let team = if profile.dev_team.members.is_empty() {
        "(none)".to_string()
    } else {
        profile
            .dev_team
            .members
            .iter()
            .map(|m| format!("{} ({})", m.name, m.role))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "You are {name}, {role}.
{app_name} is a {description}. User can try the app by {location}. Fellow team members are: {team}. {responsibility}
You work {office}; when ask for gender and age, you {gender}.
Notes:
{notes}",
        name = profile.name,
        role = profile.role,
        app_name = app.name,
        description = app.description,
        location = app.location,
        office = profile.office,
        gender = profile.gender,
        notes = bullets(&profile.notes),
    )
}

fn render_response_logic(logic: &ResponseLogic) -> String {
    let mut out = format!("{}. ", logic.knowledge_scope);
    if !logic.assumed_user_knowledge.is_empty() {
        let _ = write!(
            out,
            "When responding to queries, you assume the user has {}. ",
            logic.assumed_user_knowledge
        );
    }

    let groups: Vec<String> = [&logic.behavior, &logic.opinion_policy, &logic.off_topic]
        .into_iter()
        .filter(|items| !items.is_empty())
        .map(|items| bullets(items))
        .collect();
    if !groups.is_empty() {
        out.push_str("\nYour responses are:\n");
        out.push_str(&groups.join("\n"));
    }
    out
}

fn render_response_format(format: &ResponseFormat) -> String {
    format!(
        "Your replies are {}. You respond using a {}. You:\n{}. ",
        format.style,
        format.length_limit,
        bullets(&format.formatting)
    )
}

fn render_style_guide(style: &StyleGuide) -> String {
    format!(
        "Your writing style is {}. You use {}.",
        style.writing.format,
        smart_join(&style.writing.preferences)
    )
}

fn render_operational_boundaries(boundaries: &Boundaries) -> String {
    let diagrams = boundaries
        .project_caveats
        .diagram_status
        .iter()
        .map(|(name, status)| format!("{name} ({status})"))
        .collect::<Vec<_>>()
        .join("; ");
    let diagrams = format!(
        "- not all ontology diagrams are available. Availability of ontology diagrams: {diagrams}"
    );

    [
        bullets(&boundaries.safety_and_ethics.bias_avoidance),
        bullets(&boundaries.safety_and_ethics.language),
        bullets(&boundaries.project_caveats.app_and_chatbot_status),
        diagrams,
        bullets(&boundaries.access.ontology_data),
        bullets(&boundaries.access.graph_interactions),
        bullets(&boundaries.escalation.method),
    ]
    .join("\n")
}

fn render_personal_information(profile: &BotProfile) -> String {
    let appearance: String = profile
        .appearance
        .iter()
        .map(|(key, value)| format!("- {key}: {value}\n"))
        .collect();

    let fav = &profile.favorites;
    let food: Vec<String> = fav
        .fruits
        .iter()
        .chain(&fav.beverages)
        .chain(&fav.foods)
        .cloned()
        .collect();
    let interests = &profile.interests;
    let unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "(none)".into());

    format!(
        "
What you look like:
{appearance}
Your birthday: {birthday}
Relationship status: {relationship}
Home: {home}
Living arrangement: {lives_with}

What you like:
- colors: {colors}
- food: {food}

Your interests and hobbies:
- {science}
- {sports}
- hobbies: {hobbies}",
        birthday = unknown(&profile.birthday),
        relationship = unknown(&profile.relationship_status),
        home = unknown(&profile.home),
        lives_with = unknown(&profile.lives_with),
        colors = smart_join(&fav.colors),
        food = smart_join(&food),
        science = smart_join(&interests.science),
        sports = smart_join(&interests.sports),
        hobbies = smart_join(&interests.hobbies),
    )
}

/// One `- item` line per entry, or `(none)`.
fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".into();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `a`, `a and b`, `a, b and c`.
fn smart_join(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
