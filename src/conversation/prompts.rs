use crate::chat::{ChatPrompt, ChatTurn};
use crate::index::SearchHit;

const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the user's question.\n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n";

const CONDENSE_INSTRUCTIONS: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.";

/// System message with retrieved context followed by the user's question.
pub(crate) fn answer_prompt(question: &str, hits: &[SearchHit]) -> ChatPrompt {
    let context = hits
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    ChatPrompt {
        system: Some(format!("{ANSWER_INSTRUCTIONS}{context}")),
        user: question.to_string(),
    }
}

/// Single-message prompt asking the model to rewrite a follow-up as a standalone question.
pub(crate) fn condense_prompt(question: &str, history: &[ChatTurn]) -> ChatPrompt {
    let transcript = history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n");
    ChatPrompt {
        system: None,
        user: format!(
            "{CONDENSE_INSTRUCTIONS}\n\nChat History:\n{transcript}\nFollow Up Input: {question}\nStandalone question:"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_prompt_embeds_context_in_system_message() {
        let hits = vec![
            SearchHit {
                position: 0,
                score: 0.9,
                text: "Revenue was 10M.".into(),
            },
            SearchHit {
                position: 3,
                score: 0.5,
                text: "Costs were 4M.".into(),
            },
        ];
        let prompt = answer_prompt("What was revenue?", &hits);
        let system = prompt.system.expect("system message");
        assert!(system.starts_with("Use the following pieces of context"));
        assert!(system.ends_with("Revenue was 10M.\n\nCosts were 4M."));
        assert_eq!(prompt.user, "What was revenue?");
    }

    #[test]
    fn condense_prompt_includes_transcript_and_follow_up() {
        let history = vec![ChatTurn {
            question: "Who is the CEO?".into(),
            answer: "Jane Doe.".into(),
        }];
        let prompt = condense_prompt("How long has she served?", &history);
        assert!(prompt.system.is_none());
        assert!(
            prompt
                .user
                .contains("Human: Who is the CEO?\nAssistant: Jane Doe.")
        );
        assert!(
            prompt
                .user
                .ends_with("Follow Up Input: How long has she served?\nStandalone question:")
        );
    }
}
