//! Subject dispatch.
//!
//! Maps a subject string to its tutor and turns every failure into a
//! student-facing Arabic message. Callers always get a `String` back.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, warn};

use tawjihi_core::{AgentInfo, LlmProvider, Subject, TawjihiError};

use crate::agent::{GenerationSettings, TutorAgent};
use crate::persona::TutorPersona;

/// Returned when the tutor produced an empty answer.
pub const NO_ANSWER_MESSAGE: &str = "عذراً، لم أتمكن من الإجابة على سؤالك.";

/// Returned for a subject outside `math`, `arabic`, `english`.
pub fn unknown_subject_message() -> String {
    format!("المادة غير متوفرة. المواد المتاحة: {}", Subject::available())
}

pub struct TutorRegistry {
    tutors: HashMap<Subject, TutorAgent>,
}

impl TutorRegistry {
    /// Build one tutor per subject, all sharing `provider`.
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        let tutors = Subject::ALL
            .into_iter()
            .map(|subject| {
                let agent = TutorAgent::new(
                    TutorPersona::for_subject(subject),
                    Arc::clone(&provider),
                    settings.clone(),
                );
                (subject, agent)
            })
            .collect();
        Self { tutors }
    }

    /// Tutor for a subject name, case-insensitive.
    pub fn tutor_for(&self, subject: &str) -> Result<&TutorAgent, TawjihiError> {
        let parsed = subject.parse::<Subject>()?;
        self.tutors
            .get(&parsed)
            .ok_or_else(|| tawjihi_core::UnknownSubject(subject.to_string()).into())
    }

    /// Route `question` to the tutor for `subject`.
    pub async fn ask(&self, subject: &str, question: &str) -> String {
        let tutor = match self.tutor_for(subject) {
            Ok(tutor) => tutor,
            Err(e) => {
                warn!(error = %e, "Unknown subject");
                return unknown_subject_message();
            }
        };
        let subject = tutor.subject();

        match tutor.start(question).await {
            Ok(answer) if answer.trim().is_empty() => NO_ANSWER_MESSAGE.to_string(),
            Ok(answer) => answer,
            Err(e) => {
                error!(subject = %subject, error = %e, "Tutor failed");
                format!("حدث خطأ: {e}")
            }
        }
    }

    /// Ask the tutor to solve `problem` showing each step.
    pub async fn solve_step_by_step(&self, subject: &str, problem: &str) -> String {
        let prompt = format!(
            "حل المسألة التالية خطوة بخطوة، مع شرح كل خطوة بوضوح ثم كتابة الإجابة النهائية.\n\
             Solve the following problem step by step, explaining each step clearly, \
             then state the final answer.\n\n{problem}"
        );
        self.ask(subject, &prompt).await
    }

    /// Tutors in fixed subject order.
    pub fn agents(&self) -> Vec<AgentInfo> {
        Subject::ALL
            .iter()
            .filter_map(|s| self.tutors.get(s))
            .map(|t| t.persona().info())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    fn registry(provider: MockProvider) -> TutorRegistry {
        TutorRegistry::new(Arc::new(provider), GenerationSettings::default())
    }

    #[tokio::test]
    async fn test_unknown_subject_returns_fallback() {
        let reg = registry(MockProvider::new("mock"));
        let answer = reg.ask("physics", "What is force?").await;
        assert_eq!(answer, "المادة غير متوفرة. المواد المتاحة: math, arabic, english");
    }

    #[test]
    fn test_tutor_for_reports_unknown_subject() {
        let reg = registry(MockProvider::new("mock"));
        assert_eq!(reg.tutor_for("English").unwrap().subject(), Subject::English);
        let err = reg.tutor_for("history").err().unwrap();
        assert!(matches!(err, TawjihiError::UnknownSubject(_)));
        assert_eq!(err.to_string(), "unknown subject: history");
    }

    #[tokio::test]
    async fn test_subject_is_case_insensitive() {
        let reg = registry(MockProvider::new("mock").with_response("x = 2"));
        assert_eq!(reg.ask("  MATH ", "2x = 4").await, "x = 2");
    }

    #[tokio::test]
    async fn test_blank_answer_returns_no_answer_message() {
        let reg = registry(MockProvider::new("mock").with_response("   \n"));
        assert_eq!(reg.ask("arabic", "ما الفاعل؟").await, NO_ANSWER_MESSAGE);
    }

    #[tokio::test]
    async fn test_provider_error_is_not_propagated() {
        let reg = registry(MockProvider::new("mock").failing("connection refused"));
        let answer = reg.ask("english", "Define a noun").await;
        assert!(answer.starts_with("حدث خطأ: "));
        assert!(answer.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_routes_to_matching_persona() {
        let provider = Arc::new(MockProvider::new("mock"));
        let reg = TutorRegistry::new(provider.clone(), GenerationSettings::default());
        reg.ask("arabic", "اعرب الجملة").await;
        let requests = provider.requests();
        assert!(requests[0].system_prompt.contains("ArabicTutor"));
    }

    #[tokio::test]
    async fn test_solve_step_by_step_wraps_problem() {
        let provider = Arc::new(MockProvider::new("mock"));
        let reg = TutorRegistry::new(provider.clone(), GenerationSettings::default());
        reg.solve_step_by_step("math", "3x + 1 = 10").await;
        let prompt = &provider.requests()[0].user_prompt;
        assert!(prompt.contains("step by step"));
        assert!(prompt.ends_with("3x + 1 = 10"));
    }

    #[test]
    fn test_agents_listing() {
        let reg = registry(MockProvider::new("mock"));
        let agents = reg.agents();
        let ids: Vec<_> = agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["math", "arabic", "english"]);
        assert_eq!(agents[0].description, "متخصص في الرياضيات");
        assert_eq!(agents[2].name, "EnglishTutor");
    }
}
