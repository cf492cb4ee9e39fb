use std::collections::BTreeSet;

use crate::domain::question::QuestionKey;

/// Questions asked before the room count is known. Fixed order, one pass.
pub fn static_schedule() -> Vec<QuestionKey> {
    vec![
        QuestionKey::ClientName,
        QuestionKey::ClientAge,
        QuestionKey::ProjectType,
        QuestionKey::SquareMeters,
        QuestionKey::FinishTier,
        QuestionKey::Duration,
        QuestionKey::Budget,
        QuestionKey::HasLot,
        QuestionKey::AdditionalRooms,
    ]
}

/// Room questions materialized from the recorded additional-room count.
/// The principal bedroom contributes one bed question; every additional
/// room contributes a bed and a bathroom question, giving `2n + 1` total.
pub fn room_subflow(additional: u32) -> Vec<QuestionKey> {
    let mut questions = Vec::with_capacity(2 * additional as usize + 1);
    questions.push(QuestionKey::RoomBed(0));
    for index in 1..=additional {
        questions.push(QuestionKey::RoomBed(index));
        questions.push(QuestionKey::RoomBathroom(index));
    }
    questions
}

/// The complete interview for a known room count.
pub fn full_schedule(additional: u32) -> Vec<QuestionKey> {
    let mut questions = static_schedule();
    questions.extend(room_subflow(additional));
    questions.push(QuestionKey::Amenities);
    questions
}

pub fn question_total(additional: u32) -> usize {
    full_schedule(additional).len()
}

/// First schedule entry without a recorded answer, in interview order.
pub fn first_unanswered(
    schedule: &[QuestionKey],
    answered: &BTreeSet<QuestionKey>,
) -> Option<QuestionKey> {
    schedule.iter().find(|question| !answered.contains(question)).cloned()
}
