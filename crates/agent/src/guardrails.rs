//! Conversation scope guard.
//!
//! Extraction always runs first; the guard only classifies turns that did
//! not answer the pending question. An off-topic turn gets the fixed
//! redirect and the interview re-asks the same question, so guesses about
//! intent never mutate the record.

use crate::extraction::normalize_text;

/// Fixed redirect for turns that wander away from the interview.
pub const REDIRECT_MESSAGE: &str = "Lo siento, soy un asistente especializado en arquitectura \
     y construcción. ¿Continuamos con tu cotización?";

const OFF_TOPIC_MARKERS: &[&str] = &[
    "clima",
    "futbol",
    "deporte",
    "politica",
    "receta",
    "chiste",
    "pelicula",
    "cancion",
    "videojuego",
    "noticias",
    "horoscopo",
    "capital de",
    "cuentame un",
    "traduce",
    "poema",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeVerdict {
    InScope,
    OffTopic { marker: &'static str },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScopeGuard;

impl ScopeGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> ScopeVerdict {
        let normalized = normalize_text(text);
        for marker in OFF_TOPIC_MARKERS {
            if normalized.contains(marker) {
                return ScopeVerdict::OffTopic { marker };
            }
        }
        ScopeVerdict::InScope
    }

    pub fn redirect_message(&self) -> &'static str {
        REDIRECT_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_common_digressions() {
        let guard = ScopeGuard::new();
        for text in [
            "¿Cuál es la capital de Francia?",
            "cuéntame un chiste",
            "¿viste el partido de fútbol?",
            "dame una receta de ajiaco",
        ] {
            assert!(
                matches!(guard.classify(text), ScopeVerdict::OffTopic { .. }),
                "{text:?} should be off topic"
            );
        }
    }

    #[test]
    fn interview_answers_stay_in_scope() {
        let guard = ScopeGuard::new();
        for text in ["120 metros", "sí, con baño", "no estoy seguro del presupuesto"] {
            assert_eq!(guard.classify(text), ScopeVerdict::InScope, "{text:?}");
        }
    }

    #[test]
    fn redirect_is_fixed_and_in_spanish() {
        let guard = ScopeGuard::new();
        assert!(guard.redirect_message().contains("arquitectura"));
        assert!(guard.redirect_message().contains("cotización"));
    }
}
