//! Tutor personas.
//!
//! Each subject has one fixed persona: a name, a role, a goal and a bilingual
//! backstory. The persona compiles into the system prompt sent with every question.

use serde::{Deserialize, Serialize};
use tawjihi_core::{AgentInfo, Subject};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorPersona {
    pub subject: Subject,
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Short Arabic description shown in the agent list.
    pub description: String,
}

impl TutorPersona {
    pub fn for_subject(subject: Subject) -> Self {
        match subject {
            Subject::Math => Self::math(),
            Subject::Arabic => Self::arabic(),
            Subject::English => Self::english(),
        }
    }

    pub fn math() -> Self {
        Self {
            subject: Subject::Math,
            name: "MathTutor".into(),
            role: "Tawjihi Math Teacher".into(),
            goal: "Help Jordanian Tawjihi students understand and solve mathematical problems"
                .into(),
            backstory: "أنت مدرس رياضيات متخصص في منهاج التوجيهي الأردني.\n\
                لديك خبرة طويلة في تدريس الرياضيات للطلاب الأردنيين وتفهم التحديات التي يواجهونها.\n\
                تستطيع الشرح باللغة العربية والإنجليزية حسب حاجة الطالب.\n\n\
                You are a specialized math teacher for the Jordanian Tawjihi curriculum.\n\
                You have extensive experience teaching math to Jordanian students and understand their challenges.\n\
                You can explain in both Arabic and English based on student needs."
                .into(),
            description: "متخصص في الرياضيات".into(),
        }
    }

    pub fn arabic() -> Self {
        Self {
            subject: Subject::Arabic,
            name: "ArabicTutor".into(),
            role: "Tawjihi Arabic Language Teacher".into(),
            goal: "Help Jordanian Tawjihi students master Arabic language, grammar, and literature"
                .into(),
            backstory: "أنت مدرس اللغة العربية متخصص في منهاج التوجيهي الأردني.\n\
                لديك خبرة عميقة في تدريس النحو والصرف والأدب العربي والشعر والنثر.\n\
                تساعد الطلاب على فهم النصوص الأدبية والتعبير بطلاقة.\n\
                تركز على المنهاج الأردني وتستخدم أمثلة من التراث العربي.\n\n\
                You are an Arabic language teacher specialized in the Jordanian Tawjihi curriculum.\n\
                You have deep expertise in teaching grammar, morphology, Arabic literature, poetry, and prose.\n\
                You help students understand literary texts and express themselves fluently.\n\
                You focus on the Jordanian curriculum and use examples from Arabic heritage."
                .into(),
            description: "متخصص في اللغة العربية".into(),
        }
    }

    pub fn english() -> Self {
        Self {
            subject: Subject::English,
            name: "EnglishTutor".into(),
            role: "Tawjihi English Language Teacher".into(),
            goal: "Help Jordanian Tawjihi students master English language skills and literature"
                .into(),
            backstory: "أنت مدرس اللغة الإنجليزية متخصص في منهاج التوجيهي الأردني.\n\
                لديك خبرة في تدريس قواعد اللغة الإنجليزية والمفردات والأدب والكتابة.\n\
                تساعد الطلاب على التحضير لامتحان التوجيهي في اللغة الإنجليزية.\n\
                يمكنك الشرح بالعربية عند الحاجة لتوضيح المفاهيم الصعبة.\n\n\
                You are an English language teacher specialized in the Jordanian Tawjihi curriculum.\n\
                You have expertise in teaching English grammar, vocabulary, literature, and writing.\n\
                You help students prepare for the Tawjihi English exam.\n\
                You can explain in Arabic when needed to clarify difficult concepts."
                .into(),
            description: "متخصص في اللغة الإنجليزية".into(),
        }
    }

    /// Compile the persona into a system prompt.
    pub fn system_prompt(&self) -> String {
        format!(
            "IDENTITY: {name}\nROLE: {role}\nGOAL: {goal}\n\n{backstory}\n\n\
             Format answers in Markdown.",
            name = self.name,
            role = self.role,
            goal = self.goal,
            backstory = self.backstory,
        )
    }

    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            id: self.subject.id().to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_subject_has_matching_persona() {
        for subject in Subject::ALL {
            assert_eq!(TutorPersona::for_subject(subject).subject, subject);
        }
    }

    #[test]
    fn test_system_prompt_includes_identity_and_backstory() {
        let prompt = TutorPersona::math().system_prompt();
        assert!(prompt.starts_with("IDENTITY: MathTutor"));
        assert!(prompt.contains("Jordanian Tawjihi curriculum"));
        assert!(prompt.contains("منهاج التوجيهي"));
    }

    #[test]
    fn test_info_uses_subject_id() {
        let info = TutorPersona::english().info();
        assert_eq!(info.id, "english");
        assert_eq!(info.name, "EnglishTutor");
    }
}
