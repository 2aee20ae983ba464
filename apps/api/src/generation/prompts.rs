// All LLM prompt templates for the generation pipeline.
// Placeholders use double braces and are filled with plain string replacement.

/// Cover letter prompt. Replace: {{RESUME}}, {{JD}}, {{TONE}}
pub const COVER_LETTER_TEMPLATE: &str = r#"You are an expert career writer. Write a tailored cover letter for the candidate below.

TONE: {{TONE}}

RULES:
1. Use ONLY facts from the resume. Do not invent employers, titles, dates, or metrics
2. Address the most important requirements of the job description directly
3. Three to four short paragraphs, under 350 words
4. Open with "Dear Hiring Manager," unless the job description names a contact
5. Plain text only. No markdown, no placeholders like [Company Name]

RESUME:
{{RESUME}}

JOB DESCRIPTION:
{{JD}}"#;

/// Resume bullets prompt. Replace: {{RESUME}}, {{JD}}
pub const RESUME_BULLETS_TEMPLATE: &str = r#"You are an expert resume writer. Rewrite the candidate's experience as resume bullet points targeted at the job description below.

RULES:
1. Use ONLY facts from the resume. No invented numbers or technologies
2. Start every bullet with a strong past-tense action verb
3. Mirror keywords from the job description where the resume supports them
4. Six to eight bullets, one per line, each starting with "- "
5. No headings, no blank lines between bullets, no closing remarks

RESUME:
{{RESUME}}

JOB DESCRIPTION:
{{JD}}"#;

pub fn build_cover_letter_prompt(resume: &str, jd: &str, tone: &str) -> String {
    COVER_LETTER_TEMPLATE
        .replace("{{RESUME}}", resume)
        .replace("{{JD}}", jd)
        .replace("{{TONE}}", tone)
}

/// Tone is deliberately absent from the bullets prompt.
pub fn build_bullets_prompt(resume: &str, jd: &str) -> String {
    RESUME_BULLETS_TEMPLATE
        .replace("{{RESUME}}", resume)
        .replace("{{JD}}", jd)
}
