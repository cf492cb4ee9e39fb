//! Scoped answer extraction.
//!
//! Every turn is parsed against the single question the flow is waiting on,
//! never against the whole transcript. The pending question's kind selects
//! the parser, so a bare "35" means age at [`AskAge`] and square meters at
//! [`AskArea`] without any cross-field guessing.
//!
//! [`AskAge`]: cotiza_core::FlowState::AskAge
//! [`AskArea`]: cotiza_core::FlowState::AskArea

use std::collections::BTreeSet;

use cotiza_core::catalog::{Catalog, FinishTier};
use cotiza_core::domain::question::{
    AnswerValue, ChoiceDomain, IntegerBand, QuestionKey, QuestionKind, TextField, MAX_NAME_CHARS,
};

/// Outcome of parsing one user turn against the pending question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    Answered(AnswerValue),
    Unanswered(ExtractionMiss),
}

/// Why a turn did not answer the pending question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionMiss {
    /// Nothing in the turn matched the expected shape.
    NoMatch,
    /// A numeric value was present but every candidate fell outside the band.
    OutOfRange,
}

/// Parser registry keyed by [`QuestionKind`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FactExtractor;

impl FactExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, question: &QuestionKey, text: &str) -> Extraction {
        let normalized = normalize_text(text);
        match question.kind() {
            QuestionKind::FreeText(TextField::Name) => extract_name(text, &normalized),
            QuestionKind::FreeText(TextField::Budget) => extract_budget(text, &normalized),
            QuestionKind::Integer(band) => extract_integer(&normalized, &band),
            QuestionKind::Boolean => extract_boolean(&normalized),
            QuestionKind::SingleChoice(domain) => extract_single_choice(&normalized, domain),
            QuestionKind::MultiChoice(domain) => extract_multi_choice(&normalized, domain),
            QuestionKind::Duration => extract_duration(text, &normalized),
        }
    }
}

/// Lowercases and folds Spanish diacritics so catalog aliases (stored
/// pre-folded) match user text regardless of accents.
pub(crate) fn normalize_text(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).map(fold_diacritic).collect()
}

fn fold_diacritic(ch: char) -> char {
    match ch {
        'á' => 'a',
        'é' => 'e',
        'í' => 'i',
        'ó' => 'o',
        'ú' | 'ü' => 'u',
        'ñ' => 'n',
        other => other,
    }
}

pub(crate) fn tokenize(text: &str) -> Vec<&str> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Space-padded token join, so aliases only match at word boundaries;
/// "36 meses" must not contain the canonical "6 meses".
fn bounded_haystack(normalized: &str) -> String {
    let mut haystack = String::from(" ");
    for token in tokenize(normalized) {
        haystack.push_str(token);
        haystack.push(' ');
    }
    haystack
}

fn bounded_pattern(pattern: &str) -> String {
    format!(" {pattern} ")
}

const DURATION_WORDS: &[&str] = &[
    "mes", "meses", "ano", "anos", "semana", "semanas", "dia", "dias",
];

const WORD_NUMBERS: &[(&str, u64)] = &[
    ("cero", 0),
    ("ninguna", 0),
    ("ninguno", 0),
    ("ningun", 0),
    ("un", 1),
    ("una", 1),
    ("uno", 1),
    ("dos", 2),
    ("tres", 3),
    ("cuatro", 4),
    ("cinco", 5),
    ("seis", 6),
    ("siete", 7),
    ("ocho", 8),
    ("nueve", 9),
    ("diez", 10),
];

/// First digit run inside the band wins; "tengo 2 hijos y 35 años" answers
/// an age question with 35. Spelled-out small numbers cover answers like
/// "ninguna" for the room count.
fn extract_integer(normalized: &str, band: &IntegerBand) -> Extraction {
    let mut saw_digits = false;
    let mut current = String::new();
    for ch in normalized.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() {
            current.push(ch);
            continue;
        }
        if current.is_empty() {
            continue;
        }
        saw_digits = true;
        if let Ok(value) = current.parse::<u64>() {
            if band.contains(value) {
                return Extraction::Answered(AnswerValue::Integer(value));
            }
        }
        current.clear();
    }
    for token in tokenize(normalized) {
        if let Some((_, value)) = WORD_NUMBERS.iter().find(|(word, _)| *word == token) {
            if band.contains(*value) {
                return Extraction::Answered(AnswerValue::Integer(*value));
            }
        }
    }
    if saw_digits {
        Extraction::Unanswered(ExtractionMiss::OutOfRange)
    } else {
        Extraction::Unanswered(ExtractionMiss::NoMatch)
    }
}

fn extract_boolean(normalized: &str) -> Extraction {
    // Phrase cues beat single tokens: "aún no tengo el lote" must read as a
    // no even though it carries no standalone negation up front.
    if normalized.contains("con bano") {
        return Extraction::Answered(AnswerValue::Boolean(true));
    }
    if normalized.contains("sin bano") {
        return Extraction::Answered(AnswerValue::Boolean(false));
    }
    if normalized.contains("todavia no")
        || normalized.contains("aun no")
        || normalized.contains("estoy en proceso")
    {
        return Extraction::Answered(AnswerValue::Boolean(false));
    }
    if normalized.contains("por supuesto") {
        return Extraction::Answered(AnswerValue::Boolean(true));
    }
    for token in tokenize(normalized) {
        match token {
            "si" | "claro" | "correcto" | "afirmativo" | "listo" => {
                return Extraction::Answered(AnswerValue::Boolean(true));
            }
            "no" | "negativo" => {
                return Extraction::Answered(AnswerValue::Boolean(false));
            }
            _ => {}
        }
    }
    Extraction::Unanswered(ExtractionMiss::NoMatch)
}

/// Canonical display name plus its folded alias patterns for one choice.
fn choice_vocabulary(domain: ChoiceDomain) -> Vec<(String, Vec<String>)> {
    let catalog = Catalog::global();
    match domain {
        ChoiceDomain::ProjectType => catalog
            .project_types()
            .iter()
            .map(|project| (project.name.to_string(), alias_patterns(project.name, project.aliases)))
            .collect(),
        ChoiceDomain::FinishTier => FinishTier::ALL
            .iter()
            .map(|tier| (tier.label().to_string(), alias_patterns(tier.label(), tier.aliases())))
            .collect(),
        ChoiceDomain::BedSize => catalog
            .bed_sizes()
            .iter()
            .map(|bed| (bed.name.to_string(), alias_patterns(bed.name, bed.aliases)))
            .collect(),
        ChoiceDomain::Amenities => catalog
            .amenities()
            .iter()
            .map(|amenity| (amenity.name.to_string(), alias_patterns(amenity.name, amenity.aliases)))
            .collect(),
    }
}

fn alias_patterns(display: &str, aliases: &[&str]) -> Vec<String> {
    let mut patterns = vec![normalize_text(display)];
    patterns.extend(aliases.iter().map(|alias| normalize_text(alias)));
    patterns
}

/// Longest matching alias wins, so "california king" never resolves to the
/// plain King size it contains.
fn extract_single_choice(normalized: &str, domain: ChoiceDomain) -> Extraction {
    let vocabulary = choice_vocabulary(domain);
    let haystack = bounded_haystack(normalized);
    let mut best: Option<(usize, &str)> = None;
    for (display, patterns) in &vocabulary {
        for pattern in patterns {
            if !haystack.contains(bounded_pattern(pattern).as_str()) {
                continue;
            }
            if best.map_or(true, |(len, _)| pattern.len() > len) {
                best = Some((pattern.len(), display.as_str()));
            }
        }
    }
    match best {
        Some((_, display)) => Extraction::Answered(AnswerValue::Choice(display.to_string())),
        None => Extraction::Unanswered(ExtractionMiss::NoMatch),
    }
}

/// Collects every catalog alias occurrence, then assigns spans longest
/// first so "Sala de TV" consumes its text before the bare "Sala" alias can
/// claim it. Mentions with no catalog alias contribute nothing.
fn extract_multi_choice(normalized: &str, domain: ChoiceDomain) -> Extraction {
    let vocabulary = choice_vocabulary(domain);
    let haystack = bounded_haystack(normalized);
    let mut candidates: Vec<(usize, usize, &str)> = Vec::new();
    for (display, patterns) in &vocabulary {
        for pattern in patterns {
            let needle = bounded_pattern(pattern);
            for (start, matched) in haystack.match_indices(needle.as_str()) {
                // trim the pad spaces so adjacent mentions never collide
                candidates.push((start + 1, start + matched.len() - 1, display.as_str()));
            }
        }
    }
    candidates.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    let mut consumed: Vec<(usize, usize)> = Vec::new();
    let mut selection = BTreeSet::new();
    for (start, end, display) in candidates {
        if consumed.iter().any(|(s, e)| start < *e && *s < end) {
            continue;
        }
        consumed.push((start, end));
        selection.insert(display.to_string());
    }

    if !selection.is_empty() {
        return Extraction::Answered(AnswerValue::Selection(selection));
    }
    let declined = tokenize(normalized)
        .iter()
        .any(|token| matches!(*token, "ninguno" | "ninguna" | "nada" | "no"));
    if declined {
        Extraction::Answered(AnswerValue::Selection(BTreeSet::new()))
    } else {
        Extraction::Unanswered(ExtractionMiss::NoMatch)
    }
}

/// Enumerated options are stored canonically; anything else carrying a
/// duration word is kept verbatim.
fn extract_duration(text: &str, normalized: &str) -> Extraction {
    let catalog = Catalog::global();
    let haystack = bounded_haystack(normalized);
    for option in catalog.durations() {
        if haystack.contains(bounded_pattern(&normalize_text(option)).as_str()) {
            return Extraction::Answered(AnswerValue::Text(option.to_string()));
        }
    }
    let has_duration_word = tokenize(normalized)
        .iter()
        .any(|token| DURATION_WORDS.contains(token));
    if has_duration_word {
        Extraction::Answered(AnswerValue::Text(text.trim().to_string()))
    } else {
        Extraction::Unanswered(ExtractionMiss::NoMatch)
    }
}

fn looks_interrogative(normalized: &str) -> bool {
    if normalized.contains('?') || normalized.contains('¿') {
        return true;
    }
    const STARTERS: &[&str] = &[
        "que ", "como ", "cual ", "cuanto ", "cuanta ", "cuando ", "donde ", "por que ", "quien ",
    ];
    STARTERS.iter().any(|starter| normalized.starts_with(starter))
}

fn has_reserved_tokens(normalized: &str) -> bool {
    tokenize(normalized).iter().any(|token| {
        matches!(*token, "si" | "no" | "presupuesto" | "millones" | "millon" | "pesos" | "cop")
            || DURATION_WORDS.contains(token)
    })
}

fn strip_name_lead_in(text: &str) -> String {
    let lower = text.to_lowercase();
    for lead in ["mi nombre es ", "me llamo ", "yo soy ", "soy "] {
        if lower.starts_with(lead) {
            return text[lead.len()..].trim().to_string();
        }
    }
    text.to_string()
}

/// A plausible name is short, digit-free and not a question or an answer
/// that belongs to a later field.
fn extract_name(text: &str, normalized: &str) -> Extraction {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_CHARS {
        return Extraction::Unanswered(ExtractionMiss::NoMatch);
    }
    if normalized.chars().any(|ch| ch.is_ascii_digit()) || normalized.contains('$') {
        return Extraction::Unanswered(ExtractionMiss::NoMatch);
    }
    if looks_interrogative(normalized) || has_reserved_tokens(normalized) {
        return Extraction::Unanswered(ExtractionMiss::NoMatch);
    }
    Extraction::Answered(AnswerValue::Text(strip_name_lead_in(trimmed)))
}

/// Budget stays free text and is stored verbatim: amounts, vague answers
/// ("muy poco") and explicit declines all count. Only an empty turn or a
/// question back to the assistant re-prompts.
fn extract_budget(text: &str, normalized: &str) -> Extraction {
    let trimmed = text.trim();
    if trimmed.is_empty() || looks_interrogative(normalized) {
        return Extraction::Unanswered(ExtractionMiss::NoMatch);
    }
    Extraction::Answered(AnswerValue::Text(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(extraction: Extraction) -> AnswerValue {
        match extraction {
            Extraction::Answered(value) => value,
            Extraction::Unanswered(miss) => panic!("expected an answer, got {miss:?}"),
        }
    }

    #[test]
    fn normalization_folds_accents_and_case() {
        assert_eq!(normalize_text("Habitación PRÓXIMA año"), "habitacion proxima ano");
        assert_eq!(normalize_text("güeña"), "guena");
    }

    #[test]
    fn first_digit_run_inside_the_band_wins() {
        let extractor = FactExtractor::new();
        let value = answered(extractor.extract(&QuestionKey::ClientAge, "tengo 2 hijos y 35 años"));
        assert_eq!(value, AnswerValue::Integer(35));
    }

    #[test]
    fn digits_outside_the_band_report_out_of_range() {
        let extractor = FactExtractor::new();
        assert_eq!(
            extractor.extract(&QuestionKey::SquareMeters, "unos 5 metros"),
            Extraction::Unanswered(ExtractionMiss::OutOfRange)
        );
        assert_eq!(
            extractor.extract(&QuestionKey::ClientAge, "tengo 7 años"),
            Extraction::Unanswered(ExtractionMiss::OutOfRange)
        );
    }

    #[test]
    fn word_numbers_cover_the_room_count() {
        let extractor = FactExtractor::new();
        assert_eq!(
            answered(extractor.extract(&QuestionKey::AdditionalRooms, "ninguna")),
            AnswerValue::Integer(0)
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::AdditionalRooms, "quiero tres habitaciones")),
            AnswerValue::Integer(3)
        );
    }

    #[test]
    fn boolean_phrases_beat_single_tokens() {
        let extractor = FactExtractor::new();
        assert_eq!(
            answered(extractor.extract(&QuestionKey::HasLot, "aún no, sigo buscando")),
            AnswerValue::Boolean(false)
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::RoomBathroom(1), "sí, con baño privado")),
            AnswerValue::Boolean(true)
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::RoomBathroom(2), "esa va sin baño")),
            AnswerValue::Boolean(false)
        );
    }

    #[test]
    fn longest_alias_wins_single_choice() {
        let extractor = FactExtractor::new();
        assert_eq!(
            answered(extractor.extract(&QuestionKey::RoomBed(1), "una california king por favor")),
            AnswerValue::Choice("California King".to_string())
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::RoomBed(1), "cama king")),
            AnswerValue::Choice("King".to_string())
        );
    }

    #[test]
    fn multi_choice_consumes_spans_longest_first() {
        let extractor = FactExtractor::new();
        let value = answered(extractor.extract(&QuestionKey::Amenities, "quiero sala de tv y cocina"));
        let AnswerValue::Selection(selection) = value else {
            panic!("expected a selection");
        };
        assert!(selection.contains("Sala de TV"));
        assert!(selection.contains("Cocina"));
        assert!(!selection.contains("Sala"));
    }

    #[test]
    fn unknown_amenity_mentions_contribute_nothing() {
        let extractor = FactExtractor::new();
        let value = answered(extractor.extract(&QuestionKey::Amenities, "una piscina gigante y sauna"));
        let AnswerValue::Selection(selection) = value else {
            panic!("expected a selection");
        };
        assert_eq!(selection.len(), 1);
        assert!(selection.contains("Sauna"));
    }

    #[test]
    fn declining_amenities_yields_an_empty_selection() {
        let extractor = FactExtractor::new();
        assert_eq!(
            answered(extractor.extract(&QuestionKey::Amenities, "ninguno, gracias")),
            AnswerValue::Selection(BTreeSet::new())
        );
    }

    #[test]
    fn duration_prefers_canonical_options() {
        let extractor = FactExtractor::new();
        assert_eq!(
            answered(extractor.extract(&QuestionKey::Duration, "creo que 6 meses está bien")),
            AnswerValue::Text("6 meses".to_string())
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::Duration, "un año más o menos")),
            AnswerValue::Text("un año más o menos".to_string())
        );
        assert_eq!(
            extractor.extract(&QuestionKey::Duration, "lo antes posible"),
            Extraction::Unanswered(ExtractionMiss::NoMatch)
        );
    }

    #[test]
    fn names_reject_questions_numbers_and_reserved_answers() {
        let extractor = FactExtractor::new();
        for text in ["¿qué es esto?", "35", "6 meses", "sí", "tengo presupuesto"] {
            assert_eq!(
                extractor.extract(&QuestionKey::ClientName, text),
                Extraction::Unanswered(ExtractionMiss::NoMatch),
                "{text:?} should not pass as a name"
            );
        }
        assert_eq!(
            answered(extractor.extract(&QuestionKey::ClientName, "Me llamo Laura Restrepo")),
            AnswerValue::Text("Laura Restrepo".to_string())
        );
    }

    #[test]
    fn budget_accepts_any_statement_verbatim() {
        let extractor = FactExtractor::new();
        assert_eq!(
            answered(extractor.extract(&QuestionKey::Budget, "unos $300 millones")),
            AnswerValue::Text("unos $300 millones".to_string())
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::Budget, "no sé todavía")),
            AnswerValue::Text("no sé todavía".to_string())
        );
        assert_eq!(
            answered(extractor.extract(&QuestionKey::Budget, "muy poco")),
            AnswerValue::Text("muy poco".to_string())
        );
    }

    #[test]
    fn budget_reprompts_on_empty_or_interrogative_turns() {
        let extractor = FactExtractor::new();
        assert_eq!(
            extractor.extract(&QuestionKey::Budget, "   "),
            Extraction::Unanswered(ExtractionMiss::NoMatch)
        );
        assert_eq!(
            extractor.extract(&QuestionKey::Budget, "¿cuánto suele costar algo así?"),
            Extraction::Unanswered(ExtractionMiss::NoMatch)
        );
    }

    #[test]
    fn handles_twenty_plus_common_spanish_phrases() {
        struct Case {
            question: QuestionKey,
            text: &'static str,
            expect: AnswerValue,
        }

        let cases = vec![
            Case {
                question: QuestionKey::ClientName,
                text: "Mariana López",
                expect: AnswerValue::Text("Mariana López".into()),
            },
            Case {
                question: QuestionKey::ClientName,
                text: "soy Andrés Felipe",
                expect: AnswerValue::Text("Andrés Felipe".into()),
            },
            Case {
                question: QuestionKey::ClientAge,
                text: "35",
                expect: AnswerValue::Integer(35),
            },
            Case {
                question: QuestionKey::ClientAge,
                text: "acabo de cumplir 42 años",
                expect: AnswerValue::Integer(42),
            },
            Case {
                question: QuestionKey::ProjectType,
                text: "quiero una casa nueva",
                expect: AnswerValue::Choice("Construcción nueva".into()),
            },
            Case {
                question: QuestionKey::ProjectType,
                text: "necesito remodelar mi apartamento",
                expect: AnswerValue::Choice("Remodelación".into()),
            },
            Case {
                question: QuestionKey::SquareMeters,
                text: "120 metros cuadrados",
                expect: AnswerValue::Integer(120),
            },
            Case {
                question: QuestionKey::SquareMeters,
                text: "el lote da para unos 240 m2",
                expect: AnswerValue::Integer(240),
            },
            Case {
                question: QuestionKey::FinishTier,
                text: "acabados premium",
                expect: AnswerValue::Choice("Premium".into()),
            },
            Case {
                question: QuestionKey::FinishTier,
                text: "algo estándar está bien",
                expect: AnswerValue::Choice("Estándar".into()),
            },
            Case {
                question: QuestionKey::FinishTier,
                text: "gama media",
                expect: AnswerValue::Choice("Medio".into()),
            },
            Case {
                question: QuestionKey::Duration,
                text: "12 meses",
                expect: AnswerValue::Text("12 meses".into()),
            },
            Case {
                question: QuestionKey::Duration,
                text: "unas 30 semanas",
                expect: AnswerValue::Text("unas 30 semanas".into()),
            },
            Case {
                question: QuestionKey::Budget,
                text: "tengo 400 millones de pesos",
                expect: AnswerValue::Text("tengo 400 millones de pesos".into()),
            },
            Case {
                question: QuestionKey::HasLot,
                text: "sí, claro",
                expect: AnswerValue::Boolean(true),
            },
            Case {
                question: QuestionKey::HasLot,
                text: "todavía no lo compro",
                expect: AnswerValue::Boolean(false),
            },
            Case {
                question: QuestionKey::AdditionalRooms,
                text: "2 habitaciones más",
                expect: AnswerValue::Integer(2),
            },
            Case {
                question: QuestionKey::RoomBed(0),
                text: "queen",
                expect: AnswerValue::Choice("Queen".into()),
            },
            Case {
                question: QuestionKey::RoomBed(1),
                text: "una cama doble normal",
                expect: AnswerValue::Choice("Doble".into()),
            },
            Case {
                question: QuestionKey::RoomBed(2),
                text: "sencilla para los niños",
                expect: AnswerValue::Choice("Sencilla".into()),
            },
            Case {
                question: QuestionKey::RoomBathroom(1),
                text: "claro que sí",
                expect: AnswerValue::Boolean(true),
            },
            Case {
                question: QuestionKey::Amenities,
                text: "estudio, sala de tv y turco",
                expect: AnswerValue::Selection(
                    ["Estudio", "Sala de TV", "Turco"].iter().map(|s| s.to_string()).collect(),
                ),
            },
            Case {
                question: QuestionKey::Amenities,
                text: "piscina mediana y baño social",
                expect: AnswerValue::Selection(
                    ["Piscina mediana", "Baño Social"].iter().map(|s| s.to_string()).collect(),
                ),
            },
        ];

        let extractor = FactExtractor::new();
        for (index, case) in cases.iter().enumerate() {
            let extraction = extractor.extract(&case.question, case.text);
            assert_eq!(
                extraction,
                Extraction::Answered(case.expect.clone()),
                "case {index} ({:?}) failed for {:?}",
                case.question,
                case.text
            );
        }
    }
}
