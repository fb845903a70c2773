// Prompt constants for résumé analysis.
// The system prompt reuses the JSON-only fragment from llm_client::prompts.

/// Analysis prompt template.
/// Replace: {skills}, {experience}, {education}, {summary}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Review the following résumé and point out how it could be improved.

Return a JSON object with this EXACT schema (no extra fields):
{
  "suggestions": ["Concrete, actionable change to make"],
  "strengths": ["Something the résumé already does well"],
  "weaknesses": ["Something that hurts the résumé today"]
}

Rules:
- At most 5 items per list.
- Each item is one sentence, under 200 characters.
- Refer only to content that appears below. Do NOT invent employers, dates or skills.

SKILLS:
{skills}

EXPERIENCE:
{experience}

EDUCATION:
{education}

SUMMARY:
{summary}"#;

pub const MAX_PROMPT_SKILLS: usize = 50;
pub const MAX_EXPERIENCE_CHARS: usize = 3000;
pub const MAX_EDUCATION_CHARS: usize = 800;
pub const MAX_SUMMARY_CHARS: usize = 1000;
