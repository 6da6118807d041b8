//! Query enrichment from short-term conversational memory.
//!
//! A follow-up such as "what about salaries?" inherits the topical keywords of
//! the previous user turn: they become the search tags and are appended to
//! the query text.

use parley_core::session::Session;
use serde::{Deserialize, Serialize};

use crate::keywords::{KeywordMatches, KeywordSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedQuery {
    /// The original message, followed by any carried-over keywords.
    pub text: String,
    /// Sorted ontology matches followed by sorted focus matches.
    pub tags: Vec<String>,
}

/// Enrich `current` using the most recent non-feedback user turn in `session`.
pub fn enrich(keywords: &KeywordSet, session: &Session, current: &str) -> EnrichedQuery {
    let current_matches = keywords.matches(current);
    let previous_matches = session
        .last_user_message()
        .map(|prev| keywords.matches(prev))
        .unwrap_or_default();

    let source = if current_matches.is_empty() {
        &previous_matches
    } else {
        &current_matches
    };
    let tags = tags_from(source);

    let missing_ontology: Vec<&str> = previous_matches
        .ontology
        .difference(&current_matches.ontology)
        .map(String::as_str)
        .collect();
    let missing_focus: Vec<&str> = previous_matches
        .focus
        .difference(&current_matches.focus)
        .map(String::as_str)
        .collect();

    let mut parts = vec![current.to_string()];
    if !missing_ontology.is_empty() {
        parts.push(missing_ontology.join(" "));
    }
    if !missing_focus.is_empty() {
        parts.push(missing_focus.join(" "));
    }

    let enriched = EnrichedQuery {
        text: parts.join(" "),
        tags,
    };
    tracing::debug!(text = %enriched.text, tags = ?enriched.tags, "Enriched query");
    enriched
}

fn tags_from(matches: &KeywordMatches) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(matches.ontology.len() + matches.focus.len());
    // BTreeSet iteration is already sorted; the vocabularies are disjoint
    for tag in matches.ontology.iter().chain(matches.focus.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::session::{SessionId, Turn};

    fn keywords() -> KeywordSet {
        KeywordSet::new(
            ["china", "germany", "singapore", "usa"],
            ["department", "employee", "role"],
        )
    }

    fn session(turns: Vec<Turn>) -> Session {
        Session {
            session_id: SessionId::from("s").0,
            history: turns,
        }
    }

    #[test]
    fn follow_up_inherits_previous_tags() {
        let s = session(vec![Turn::new("How many employee records in Germany?", "42.")]);
        let q = enrich(&keywords(), &s, "what about salaries?");

        assert_eq!(q.tags, vec!["germany", "employee"]);
        assert_eq!(q.text, "what about salaries? germany employee");
    }

    #[test]
    fn current_matches_win_for_tags() {
        let s = session(vec![Turn::new("Germany employee count?", "Yes.")]);
        let q = enrich(&keywords(), &s, "And the USA?");

        assert_eq!(q.tags, vec!["usa"]);
        // Previous ontology term still appended, and previous focus
        assert_eq!(q.text, "And the USA? germany employee");
    }

    #[test]
    fn nothing_missing_means_text_unchanged() {
        let s = session(vec![Turn::new("usa role", "ok")]);
        let q = enrich(&keywords(), &s, "USA Role details");
        assert_eq!(q.text, "USA Role details");
        assert_eq!(q.tags, vec!["usa", "role"]);
    }

    #[test]
    fn feedback_turns_are_skipped() {
        let s = session(vec![
            Turn::new("department heads in singapore", "Three."),
            Turn::feedback("china china", "thanks"),
        ]);
        let q = enrich(&keywords(), &s, "tell me more");
        assert_eq!(q.tags, vec!["singapore", "department"]);
    }

    #[test]
    fn empty_history_degenerates_to_current_tags() {
        let q = enrich(&keywords(), &session(vec![]), "role of China and USA");
        assert_eq!(q.tags, vec!["china", "usa", "role"]);
        assert_eq!(q.text, "role of China and USA");
    }

    #[test]
    fn plural_forms_are_not_keywords() {
        let s = session(vec![Turn::new("How many employees?", "42.")]);
        let q = enrich(&keywords(), &s, "and their departments?");
        assert!(q.tags.is_empty());
        assert_eq!(q.text, "and their departments?");
    }

    #[test]
    fn accented_keywords_match_whole_words() {
        let kw = KeywordSet::new(["zürich", "münchen"], ["mitarbeiter"]);
        let s = session(vec![Turn::new("Mitarbeiter in Zürich?", "Zwölf.")]);
        let q = enrich(&kw, &s, "und in München?");
        assert_eq!(q.tags, vec!["münchen"]);
        assert_eq!(q.text, "und in München? zürich mitarbeiter");
    }

    #[test]
    fn missing_groups_are_sorted() {
        let s = session(vec![Turn::new("usa china germany", "ok")]);
        let q = enrich(&keywords(), &s, "hmm");
        assert_eq!(q.text, "hmm china germany usa");
    }

    #[test]
    fn enrichment_only_appends() {
        let s = session(vec![Turn::new("germany role", "ok")]);
        for text in ["", "  spaced  out ", "Ünïcödé words", "role?"] {
            let q = enrich(&keywords(), &s, text);
            assert!(q.text.starts_with(text));
        }
    }

    #[test]
    fn inherited_tag_need_not_lead_the_text() {
        let s = session(vec![Turn::new("Who leads Germany?", "Tay.")]);
        let q = enrich(&keywords(), &s, "and their deputy");
        assert!(q.tags.contains(&"germany".to_string()));
        assert!(!q.text.starts_with("germany"));
    }
}
