use serde::{Deserialize, Serialize};

use crate::domain::question::{Answer, QuestionKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowType {
    Intake,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Idle,
    AskName,
    AskAge,
    AskProjectType,
    AskArea,
    AskFinishTier,
    AskDuration,
    AskBudget,
    AskHasLot,
    AskRoomCount,
    AskRoomBed(u32),
    AskRoomBathroom(u32),
    AskAmenities,
    Computing,
    Complete,
}

impl FlowState {
    /// The single question an incoming turn is parsed against. `None` for
    /// the states that do not wait on the client.
    pub fn pending_question(&self) -> Option<QuestionKey> {
        match self {
            Self::Idle | Self::Computing | Self::Complete => None,
            Self::AskName => Some(QuestionKey::ClientName),
            Self::AskAge => Some(QuestionKey::ClientAge),
            Self::AskProjectType => Some(QuestionKey::ProjectType),
            Self::AskArea => Some(QuestionKey::SquareMeters),
            Self::AskFinishTier => Some(QuestionKey::FinishTier),
            Self::AskDuration => Some(QuestionKey::Duration),
            Self::AskBudget => Some(QuestionKey::Budget),
            Self::AskHasLot => Some(QuestionKey::HasLot),
            Self::AskRoomCount => Some(QuestionKey::AdditionalRooms),
            Self::AskRoomBed(index) => Some(QuestionKey::RoomBed(*index)),
            Self::AskRoomBathroom(index) => Some(QuestionKey::RoomBathroom(*index)),
            Self::AskAmenities => Some(QuestionKey::Amenities),
        }
    }

    pub fn for_question(key: &QuestionKey) -> FlowState {
        match key {
            QuestionKey::ClientName => Self::AskName,
            QuestionKey::ClientAge => Self::AskAge,
            QuestionKey::ProjectType => Self::AskProjectType,
            QuestionKey::SquareMeters => Self::AskArea,
            QuestionKey::FinishTier => Self::AskFinishTier,
            QuestionKey::Duration => Self::AskDuration,
            QuestionKey::Budget => Self::AskBudget,
            QuestionKey::HasLot => Self::AskHasLot,
            QuestionKey::AdditionalRooms => Self::AskRoomCount,
            QuestionKey::RoomBed(index) => Self::AskRoomBed(*index),
            QuestionKey::RoomBathroom(index) => Self::AskRoomBathroom(*index),
            QuestionKey::Amenities => Self::AskAmenities,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    SessionOpened,
    AnswerRecorded(Answer),
    CostsComputed,
    NewQuotationRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    /// Recorded additional room count, once the room count question has
    /// been answered. Room states cannot be resolved without it.
    pub additional_rooms: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    MaterializeRoomFlows { additional: u32 },
    EvaluatePricing,
    OfferDocumentExport,
    DispatchCompletionNotice,
    ResetQuotation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
