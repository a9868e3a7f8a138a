// Prompt constants and builders for evaluation report synthesis.

use crate::models::interview::InterviewRow;
use crate::models::transcript::TranscriptRecord;

/// System prompt for report synthesis.
pub const REPORT_SYSTEM: &str = "You are an expert HR recruiter and interviewer. \
    You evaluate interview transcripts strictly on their content and produce \
    formal, concise, professional reports.";

/// The six competency dimensions scored 1-10 in every report.
pub const COMPETENCY_DIMENSIONS: [&str; 6] = [
    "Technical Knowledge",
    "Problem-Solving Ability",
    "Communication Skills",
    "Confidence",
    "Teamwork & Adaptability",
    "Cultural Fit",
];

/// The fixed headings every report is produced under, in order.
pub const REPORT_HEADINGS: [&str; 8] = [
    "Interview Evaluation Report",
    "Candidate Information",
    "Attempt Summary",
    "Evaluation and Scoring",
    "Overall Performance Summary",
    "Strengths",
    "Areas for Improvement",
    "Final Recommendation",
];

/// Builds the single evaluation prompt for one interview: candidate identity,
/// role metadata, the planned question list as ground truth, and the entire
/// transcript. The model must reconcile planned vs actually-asked questions
/// (paraphrase-equivalent counts), classify each as attempted or skipped, and
/// score the fixed competency dimensions using transcript evidence only.
pub fn build_report_prompt(interview: &InterviewRow, record: &TranscriptRecord) -> String {
    let questions = interview
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {q}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let transcript = record
        .entries
        .iter()
        .map(|e| format!("AI: {}\nCandidate: {}", e.ai_text, e.user_text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let dimensions = COMPETENCY_DIMENSIONS
        .iter()
        .map(|d| format!("  - {d}"))
        .collect::<Vec<_>>()
        .join("\n");

    let headings = REPORT_HEADINGS
        .iter()
        .map(|h| format!("  **{h}**"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Generate a professional interview evaluation report.

Interview Details:
- Candidate Name: {candidate_name}
- Position Applied: {job_position}
- Job Description: {job_description}
- Interview Duration: {duration} minutes
- Interview Type(s): {types}
- Total Questions (Planned): {question_count}

Planned Questions (ground truth):
{questions}

Conversation Transcript (for your analysis only):
{transcript}

Strict Analysis Rules:
- Base the evaluation ONLY on the conversation transcript.
- Use the Planned Questions list as the ground truth ({question_count} total).
- Identify which planned questions were actually asked in the conversation, even if rephrased. If a question was repeated casually, count it only once.
- For each planned question: a valid, relevant answer marks it Attempted; no answer or an irrelevant response marks it Skipped / Not Attempted.
- In the "Attempt Summary", show: Total Planned Questions = {question_count}, Actual Unique Questions Asked, Attempted, and Skipped / Not Attempted.
- DO NOT invent or assume answers beyond the transcript.
- Score each of the following on a 1-10 scale, only after the mapping above:
{dimensions}

Produce the report under these fixed headings, in order:
{headings}

Details:
- Open "Interview Evaluation Report" with 2-3 formal lines stating that the report evaluates the candidate's performance strictly from the actual conversation and assesses suitability for the applied role.
- "Candidate Information": name, position, type, duration.
- "Attempt Summary": planned vs actual unique vs attempted vs skipped.
- "Evaluation and Scoring": the 1-10 scores per dimension.
- "Overall Performance Summary": 1-2 short paragraphs.
- "Strengths" / "Areas for Improvement": bullet points.
- "Final Recommendation": Hire / Consider / Not Hire, with reasoning.
- Keep the style formal, concise, professional."#,
        candidate_name = record.transcript.candidate_name,
        job_position = interview.job_position,
        job_description = interview.job_description,
        duration = interview.duration_minutes,
        types = interview.types.join(", "),
        question_count = interview.questions.len(),
    )
}
