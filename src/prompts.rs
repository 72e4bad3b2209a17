//! The fixed transcription instruction sent with every analysis request.
//!
//! Centralising the prompt here means the default behaviour is changed in
//! exactly one place, and unit tests can inspect it without a live call.
//! Callers can override it via [`crate::config::AnalysisConfig::instruction`].

/// Default instruction for transcribing a PDF into Markdown.
///
/// Used when `AnalysisConfig::instruction` is `None`.
pub const DEFAULT_INSTRUCTION: &str = r#"Analyse the attached PDF document and convert its content into clean, well-structured Markdown.

Follow these rules precisely:

1. STRUCTURE
   - Represent the document's title, headings, bullet points, and tables
     with the matching Markdown elements
   - Use # for the main title, ## / ### for sections and subsections
   - Convert tables to GFM pipe format

2. FIDELITY
   - Extract the content accurately and completely
   - Maintain the reading order as a human would read the page

3. LANGUAGE
   - Write the output in the document's own language

4. OUTPUT FORMAT
   - Output ONLY the Markdown text
   - Do NOT wrap the output in ```markdown fences
   - Do NOT add commentary or explanations"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_forbids_fenced_output() {
        assert!(DEFAULT_INSTRUCTION.contains("ONLY the Markdown"));
        assert!(!DEFAULT_INSTRUCTION.trim().is_empty());
    }
}
