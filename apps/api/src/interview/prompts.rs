// Prompt constants and builders for the per-turn dialogue controller.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Fixed reply for every turn after the interview has ended, and for the
/// terminal turn itself (the model's own wrap-up text is discarded).
pub const CLOSING_UTTERANCE: &str =
    "Thank you for your time today! This concludes our interview. We'll be in touch soon.";

/// System prompt for every turn.
pub const TURN_SYSTEM: &str = "You are a friendly AI interviewer. \
    Always follow the structured rules and append the JSON control token \
    at the end of every reply.";

/// Builds the per-turn prompt. The model sees only the current question, the
/// next one (if any) for paraphrasing, and the candidate's utterance — never
/// the full list, its length beyond the question number, or category labels.
pub fn build_turn_prompt(
    question_number: usize,
    current_question: &str,
    next_question: Option<&str>,
    utterance: &str,
) -> String {
    let next_line = match next_question {
        Some(q) => format!("Next Question: \"{q}\"\n"),
        None => String::new(),
    };

    format!(
        r#"You are an AI interviewer. You are currently on Question {question_number} of the interview.

Current Question: "{current_question}"
{next_line}
The candidate just said: "{utterance}"

Rules:
- Speak naturally, like a human interviewer.
- Do NOT reveal that you have a predefined question list.
- If the candidate greets casually (hi, hello, etc.): greet back warmly and keep them on the same question. Do NOT advance.
- If the candidate asks you to repeat: restate the current question in your own words, never word-for-word.
- If the candidate says they don't know or similar: encourage them positively, then ask whether they want the question repeated or to move on.
- If the candidate explicitly says "move on" or similar: go to the next question.
- If the candidate gives a substantive answer: acknowledge it positively, then ask the next question paraphrased in your own words, keeping its meaning intact.
- When paraphrasing, never include metadata like [Technical] or [Behavioral] in your spoken text. Use synonyms and a conversational tone so it sounds improvised but keeps the same intent.
- Never skip a question unless the candidate explicitly asks to move on.
- NEVER return to a question that has already been covered. If the candidate asks to go back or mentions a previous question, politely refuse and continue from the current question or forward.
- If this is the last question and it has been answered: wrap up politely, thank them for their time, and do NOT ask anything further.

At the end of your reply, append exactly one JSON control token on its own line:
{{"action": "stay"}} to hold on the current question, or {{"action": "next"}} to advance."#
    )
}
