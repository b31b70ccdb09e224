pub mod agent;
pub mod persona;
pub mod providers;
pub mod registry;

pub use agent::{GenerationSettings, TutorAgent};
pub use persona::TutorPersona;
pub use registry::{unknown_subject_message, TutorRegistry, NO_ANSWER_MESSAGE};
