use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sanity band applied to the client age answer.
pub const AGE_BAND: IntegerBand = IntegerBand { min: 10, max: Some(120) };

/// Plausible project surface in whole square meters (strictly above 10,
/// strictly below 10,000).
pub const AREA_BAND: IntegerBand = IntegerBand { min: 11, max: Some(9_999) };

/// Additional room count. Zero is a valid answer and there is no upper cap.
pub const ROOM_COUNT_BAND: IntegerBand = IntegerBand { min: 0, max: None };

/// Longest client name accepted before the turn is treated as noise.
pub const MAX_NAME_CHARS: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionKey {
    ClientName,
    ClientAge,
    ProjectType,
    SquareMeters,
    FinishTier,
    Duration,
    Budget,
    HasLot,
    AdditionalRooms,
    /// Bed size for room `index`. Index zero is the principal bedroom.
    RoomBed(u32),
    /// Private bathroom for additional room `index`. The principal bedroom
    /// never gets this question, so index zero does not occur.
    RoomBathroom(u32),
    Amenities,
}

impl QuestionKey {
    pub fn storage_key(&self) -> String {
        match self {
            Self::ClientName => "client_name".to_string(),
            Self::ClientAge => "client_age".to_string(),
            Self::ProjectType => "project_type".to_string(),
            Self::SquareMeters => "square_meters".to_string(),
            Self::FinishTier => "finish_tier".to_string(),
            Self::Duration => "duration".to_string(),
            Self::Budget => "budget".to_string(),
            Self::HasLot => "has_lot".to_string(),
            Self::AdditionalRooms => "additional_rooms".to_string(),
            Self::RoomBed(index) => format!("room_{index}_bed"),
            Self::RoomBathroom(index) => format!("room_{index}_bathroom"),
            Self::Amenities => "amenities".to_string(),
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            Self::ClientName => QuestionKind::FreeText(TextField::Name),
            Self::ClientAge => QuestionKind::Integer(AGE_BAND),
            Self::ProjectType => QuestionKind::SingleChoice(ChoiceDomain::ProjectType),
            Self::SquareMeters => QuestionKind::Integer(AREA_BAND),
            Self::FinishTier => QuestionKind::SingleChoice(ChoiceDomain::FinishTier),
            Self::Duration => QuestionKind::Duration,
            Self::Budget => QuestionKind::FreeText(TextField::Budget),
            Self::HasLot => QuestionKind::Boolean,
            Self::AdditionalRooms => QuestionKind::Integer(ROOM_COUNT_BAND),
            Self::RoomBed(_) => QuestionKind::SingleChoice(ChoiceDomain::BedSize),
            Self::RoomBathroom(_) => QuestionKind::Boolean,
            Self::Amenities => QuestionKind::MultiChoice(ChoiceDomain::Amenities),
        }
    }

    /// Canonical Spanish wording. Phrasing collaborators may reword this,
    /// never replace its meaning.
    pub fn prompt(&self) -> String {
        match self {
            Self::ClientName => {
                "¡Hola! Soy tu asistente de cotización de construcción. ¿Cuál es tu nombre?"
                    .to_string()
            }
            Self::ClientAge => "¿Cuál es tu edad?".to_string(),
            Self::ProjectType => {
                "¿Qué tipo de proyecto tienes en mente? (Construcción nueva, Remodelación, \
                 Ampliación u Otro)"
                    .to_string()
            }
            Self::SquareMeters => {
                "¿Cuántos metros cuadrados aproximados tendrá el proyecto?".to_string()
            }
            Self::FinishTier => {
                "¿Qué nivel de acabados deseas? (Estándar, Medio o Premium)".to_string()
            }
            Self::Duration => "¿En cuánto tiempo esperas ejecutar el proyecto?".to_string(),
            Self::Budget => "¿Cuál es tu presupuesto estimado?".to_string(),
            Self::HasLot => "¿Ya cuentas con el lote?".to_string(),
            Self::AdditionalRooms => {
                "Además de la habitación principal, ¿cuántas habitaciones adicionales necesitas?"
                    .to_string()
            }
            Self::RoomBed(0) => {
                "Hablemos de la habitación principal. ¿Qué tamaño de cama tendrá? (Sencilla, \
                 Doble, Queen, King o California King)"
                    .to_string()
            }
            Self::RoomBed(index) => {
                format!(
                    "¿Qué tamaño de cama tendrá la habitación adicional {index}? (Sencilla, \
                     Doble, Queen, King o California King)"
                )
            }
            Self::RoomBathroom(index) => {
                format!("¿La habitación adicional {index} tendrá baño propio?")
            }
            Self::Amenities => {
                "¿Qué espacios adicionales te gustaría incluir? (por ejemplo Estudio, Sala de TV, \
                 Cocina, Piscina pequeña...)"
                    .to_string()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionKind {
    FreeText(TextField),
    Integer(IntegerBand),
    Boolean,
    SingleChoice(ChoiceDomain),
    MultiChoice(ChoiceDomain),
    Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextField {
    Name,
    Budget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceDomain {
    ProjectType,
    FinishTier,
    BedSize,
    Amenities,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerBand {
    pub min: u64,
    pub max: Option<u64>,
}

impl IntegerBand {
    pub fn contains(&self, value: u64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerValue {
    Text(String),
    Integer(u64),
    Boolean(bool),
    Choice(String),
    Selection(BTreeSet<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub key: QuestionKey,
    pub value: AnswerValue,
}

impl Answer {
    pub fn new(key: QuestionKey, value: AnswerValue) -> Self {
        Self { key, value }
    }
}
