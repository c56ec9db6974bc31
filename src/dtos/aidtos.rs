use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::service::ai_service::{GenerationKind, QuestionAnswer};

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct GeminiPromptDto {
    #[validate(length(min = 1, max = 8000, message = "Prompt must be between 1-8000 characters"))]
    pub prompt: String,
}

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct GenerateTextDto {
    pub kind: GenerationKind,

    #[validate(length(min = 3, max = 4000, message = "Context must be between 3-4000 characters"))]
    pub context: String,
}

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct SkillAssessmentDto {
    #[validate(length(min = 2, max = 60, message = "Skill must be between 2-60 characters"))]
    pub skill: String,

    /// Absent on the first call, which only fetches the questions.
    #[validate(length(min = 1, max = 10, message = "Between 1 and 10 answers"))]
    pub answers: Option<Vec<QuestionAnswer>>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPanDto {
    #[validate(length(equal = 10, message = "PAN must be 10 characters"))]
    pub pan: String,

    #[validate(length(min = 2, max = 100, message = "Name must be between 2-100 characters"))]
    pub name: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct VerifyGstinDto {
    #[validate(length(equal = 15, message = "GSTIN must be 15 characters"))]
    pub gstin: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_assessment_parses_without_answers() {
        let dto: SkillAssessmentDto = serde_json::from_str(r#"{"skill":"electrician"}"#).unwrap();
        assert!(dto.answers.is_none());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_generate_kind_snake_case() {
        let dto: GenerateTextDto =
            serde_json::from_str(r#"{"kind":"profile_bio","context":"Carpenter, 8 years"}"#).unwrap();
        assert_eq!(dto.kind, GenerationKind::ProfileBio);
    }

    #[test]
    fn test_pan_length() {
        let dto = VerifyPanDto {
            pan: "ABCDE1234".to_string(),
            name: "Ravi Kumar".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
