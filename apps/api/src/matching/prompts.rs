// Prompt constants for candidate/job compatibility scoring.

/// System prompt for scoring. The reply is parsed for a single integer.
pub const SCORE_SYSTEM: &str = "You are an experienced technical recruiter. \
    You judge how well a candidate fits a job posting. \
    You MUST respond with a single integer between 0 and 100 and nothing else. \
    Do NOT include explanations, ranges, or units.";

/// Scoring prompt template.
/// Replace: {candidate_skills}, {experience}, {job_title}, {job_description}, {job_skills}
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Rate the compatibility between this candidate and this job on a scale of 0 to 100.

100 means the candidate meets every requirement with directly relevant experience.
50 means roughly half of the requirements are covered.
0 means no meaningful overlap.

CANDIDATE SKILLS:
{candidate_skills}

CANDIDATE EXPERIENCE:
{experience}

JOB TITLE:
{job_title}

JOB DESCRIPTION:
{job_description}

REQUIRED SKILLS:
{job_skills}

Respond with the integer score only."#;

pub const MAX_PROMPT_SKILLS: usize = 40;
pub const MAX_EXPERIENCE_CHARS: usize = 1500;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_TITLE_CHARS: usize = 200;
