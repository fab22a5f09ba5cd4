//! Narrative prompt composition. Plain interpolation into a fixed template.

use crate::domain::{ClassificationResult, SeverityTier};

const UNIDENTIFIED_CONDITION: &str = "an unidentified condition";
const NO_MESSAGE: &str = "(no additional message)";

/// Build the instruction prompt for the narrative generator.
pub fn compose_prompt(
    diagnosis: Option<&ClassificationResult>,
    severity: SeverityTier,
    message: Option<&str>,
) -> String {
    let message = message.map(str::trim).unwrap_or(NO_MESSAGE);

    let finding = match diagnosis {
        Some(top) => format!(
            "The patient has uploaded an image which was diagnosed as **{}** (Confidence: {}%).",
            top.label,
            top.confidence_percent()
        ),
        None => "The patient did not upload an image; the assessment is based on their description only."
            .to_string(),
    };
    let disease = diagnosis
        .map(|top| top.label.as_str())
        .unwrap_or(UNIDENTIFIED_CONDITION);

    format!(
        "{finding}\n\
         According to medical guidelines, the severity of this condition is considered **{severity}**.\n\
         \n\
         The patient also asked: \"{message}\"\n\
         \n\
         Please provide a detailed, empathetic medical response including:\n\
         1. A clear explanation of what {disease} is.\n\
         2. Why it is considered {severity} severity.\n\
         3. Common causes.\n\
         4. Effective remedies and generic medicine names.\n\
         5. When to see a doctor immediately.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_interpolates_all_fields() {
        let top = ClassificationResult::new("chickenpox", 0.9421);
        let prompt = compose_prompt(Some(&top), SeverityTier::High, Some("is it contagious?"));

        assert!(prompt.contains("**chickenpox** (Confidence: 94.21%)"));
        assert!(prompt.contains("considered **High**"));
        assert!(prompt.contains("\"is it contagious?\""));
        assert!(prompt.contains("what chickenpox is"));
        assert!(prompt.contains("Why it is considered High severity"));
        assert!(prompt.contains("generic medicine names"));
        assert!(prompt.contains("When to see a doctor"));
    }

    #[test]
    fn test_prompt_without_image_or_message() {
        let prompt = compose_prompt(None, SeverityTier::Low, None);

        assert!(prompt.contains("did not upload an image"));
        assert!(prompt.contains(UNIDENTIFIED_CONDITION));
        assert!(prompt.contains(NO_MESSAGE));
        assert!(prompt.contains("**Low**"));
    }
}
