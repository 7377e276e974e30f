//! Prompts for note structuring and summarization

pub const STRUCTURING_SYSTEM_PROMPT: &str = r#"You are an assistant that extracts structured data from clinical notes.
You MUST respond with valid JSON ONLY, with this exact structure:

{
  "patient": {
    "name": string or null,
    "age": integer or null,
    "sex": string or null
  },
  "conditions": [ {"name": string} ],
  "medications": [ {"name": string, "dose": string or null, "route": string or null, "frequency": string or null} ],
  "vitals": [ {"type": string, "value": string, "unit": string or null} ],
  "labs": [ {"name": string, "value": string or null, "unit": string or null} ],
  "plan": [ {"description": string} ]
}

If some sections are not present in the note, return empty lists or nulls for those fields.
Do NOT include any extra keys or comments."#;

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a clinical documentation assistant.
Summarize the following medical note into 3-5 concise bullet points, focusing on chief complaint, key history, exam findings, and plan.
Do not add findings that are not in the note."#;

pub fn structuring_user_prompt(note: &str) -> String {
    format!("Clinical note:\n\n{note}\n\nExtract the structured data now.")
}

pub fn summary_user_prompt(note: &str) -> String {
    format!("Medical note:\n{note}")
}
