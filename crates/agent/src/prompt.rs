//! User prompt composition.

use crate::retrieval::ContextBundle;

/// Compose the user prompt from whichever context blocks are present.
///
/// Section order is fixed and the current question is always the last section.
pub fn compose(question: &str, context: &ContextBundle) -> String {
    let sections = [
        ("Diagram_Context", context.image_context.as_deref()),
        ("Document_Context", context.doc_context.as_deref()),
        ("Story_Context", context.story_context.as_deref()),
        ("Conversation_History", context.history_context.as_deref()),
    ];

    let mut parts: Vec<String> = sections
        .into_iter()
        .filter_map(|(label, body)| {
            body.filter(|b| !b.trim().is_empty())
                .map(|b| format!("### {label}\n{b}"))
        })
        .collect();
    parts.push(format!("### Current_User_Question\n{question}"));

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_only() {
        assert_eq!(
            compose("Who leads the team?", &ContextBundle::default()),
            "### Current_User_Question\nWho leads the team?"
        );
    }

    #[test]
    fn sections_follow_fixed_order() {
        let context = ContextBundle {
            doc_context: Some("doc".into()),
            story_context: Some("story".into()),
            image_context: Some("- image_url: u, description: d".into()),
            history_context: Some("User: hi\nBot: hello".into()),
        };
        assert_eq!(
            compose("q", &context),
            "### Diagram_Context\n- image_url: u, description: d\n\n\
             ### Document_Context\ndoc\n\n\
             ### Story_Context\nstory\n\n\
             ### Conversation_History\nUser: hi\nBot: hello\n\n\
             ### Current_User_Question\nq"
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let context = ContextBundle {
            doc_context: Some(String::new()),
            story_context: None,
            image_context: Some("  \n".into()),
            history_context: Some("User: a\nBot: b".into()),
        };
        let prompt = compose("q", &context);
        assert!(!prompt.contains("Document_Context"));
        assert!(!prompt.contains("Diagram_Context"));
        assert!(prompt.starts_with("### Conversation_History"));
    }

    #[test]
    fn question_is_always_last() {
        let context = ContextBundle {
            story_context: Some("### Current_User_Question\nfake".into()),
            ..ContextBundle::default()
        };
        let prompt = compose("real", &context);
        assert!(prompt.ends_with("### Current_User_Question\nreal"));
    }
}
