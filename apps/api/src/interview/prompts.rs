// Prompt templates for question generation and answer grading.
// Placeholders in `{braces}` are filled by `render_prompt` before sending.

/// Single question for one tier. Replace `{tier}` and `{role}`.
pub const QUESTION_PROMPT_TEMPLATE: &str = "Generate one {tier} level technical interview question \
    for a {role}. Only return the question text, nothing else.";

/// Question set tailored to a resume. Replace `{resume_text}` and `{count}`.
pub const RESUME_QUESTIONS_PROMPT_TEMPLATE: &str = r#"Read this resume:
{resume_text}

Generate {count} interview questions relevant to this candidate.
Only return the questions as a numbered list, one question per line, like:
1. First question
2. Second question"#;

/// System prompt for grading a single answer.
pub const SCORE_SYSTEM: &str = "You are a strict but fair technical interviewer. \
    You grade answers to interview questions on a 1 to 10 scale. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

/// Answer grading prompt. Replace `{question}` and `{answer}`.
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Grade the candidate's answer to this interview question.

Question: {question}
Answer: {answer}

An empty or irrelevant answer scores 1. A complete, correct and well explained answer scores 10.

Return a JSON object with this EXACT schema:
{"score": 7, "rationale": "one sentence"}"#;

/// Interview summary prompt. Replace `{final_score}` and `{transcript}`.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Write a short evaluation (3 sentences max) of a candidate
for an interviewer dashboard. The candidate's average score was {final_score}/10.

Transcript:
{transcript}"#;

/// Fills `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never scanned again, so user text containing
/// `{answer}` or `{count}` reaches the model verbatim. Braces that do not name
/// a known placeholder (the JSON schema example) are kept as-is.
pub fn render_prompt(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
