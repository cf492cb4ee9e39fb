use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::FinishTier;
use crate::domain::question::{Answer, AnswerValue, QuestionKey};
use crate::errors::DomainError;
use crate::pricing::CostBreakdown;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub bed_size: String,
    pub has_bathroom: bool,
}

/// Accumulated facts for one quotation. Mutated only through recorded
/// answers and the pricing engine; free-form turn text never lands here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationRecord {
    pub client_name: Option<String>,
    pub client_age: Option<u64>,
    pub project_type: Option<String>,
    pub area_m2: Option<Decimal>,
    pub finish_tier: Option<FinishTier>,
    pub duration_estimate: Option<String>,
    pub budget_estimate: Option<String>,
    pub has_lot: Option<bool>,
    pub additional_rooms: Option<u32>,
    /// Room zero is the principal bedroom. Entries appear in interview
    /// order as their bed answers are recorded.
    pub rooms: Vec<Room>,
    pub amenities: BTreeSet<String>,
    pub costs: Option<CostBreakdown>,
    pub created_at: DateTime<Utc>,
}

impl QuotationRecord {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            client_name: None,
            client_age: None,
            project_type: None,
            area_m2: None,
            finish_tier: None,
            duration_estimate: None,
            budget_estimate: None,
            has_lot: None,
            additional_rooms: None,
            rooms: Vec::new(),
            amenities: BTreeSet::new(),
            costs: None,
            created_at,
        }
    }

    pub fn apply_answer(&mut self, answer: &Answer) -> Result<(), DomainError> {
        match (&answer.key, &answer.value) {
            (QuestionKey::ClientName, AnswerValue::Text(value)) => {
                self.client_name = Some(value.clone());
            }
            (QuestionKey::ClientAge, AnswerValue::Integer(value)) => {
                self.client_age = Some(*value);
            }
            (QuestionKey::ProjectType, AnswerValue::Choice(value)) => {
                self.project_type = Some(value.clone());
            }
            (QuestionKey::SquareMeters, AnswerValue::Integer(value)) => {
                self.area_m2 = Some(Decimal::from(*value));
            }
            (QuestionKey::FinishTier, AnswerValue::Choice(value)) => {
                let tier = FinishTier::from_label(value).ok_or_else(|| {
                    DomainError::InvariantViolation(format!(
                        "finish tier answer `{value}` is not a catalog tier"
                    ))
                })?;
                self.finish_tier = Some(tier);
            }
            (QuestionKey::Duration, AnswerValue::Text(value)) => {
                self.duration_estimate = Some(value.clone());
            }
            (QuestionKey::Budget, AnswerValue::Text(value)) => {
                self.budget_estimate = Some(value.clone());
            }
            (QuestionKey::HasLot, AnswerValue::Boolean(value)) => {
                self.has_lot = Some(*value);
            }
            (QuestionKey::AdditionalRooms, AnswerValue::Integer(value)) => {
                let count = u32::try_from(*value).map_err(|_| {
                    DomainError::InvariantViolation(format!(
                        "additional room count {value} exceeds the supported range"
                    ))
                })?;
                self.additional_rooms = Some(count);
            }
            (QuestionKey::RoomBed(index), AnswerValue::Choice(value)) => {
                let expected = self.rooms.len();
                if *index as usize != expected {
                    return Err(DomainError::InvariantViolation(format!(
                        "bed answer for room {index} arrived while {expected} rooms are recorded"
                    )));
                }
                self.rooms.push(Room { bed_size: value.clone(), has_bathroom: false });
            }
            (QuestionKey::RoomBathroom(index), AnswerValue::Boolean(value)) => {
                let room = self.rooms.get_mut(*index as usize).ok_or_else(|| {
                    DomainError::InvariantViolation(format!(
                        "bathroom answer for room {index} arrived before its bed answer"
                    ))
                })?;
                room.has_bathroom = *value;
            }
            (QuestionKey::Amenities, AnswerValue::Selection(values)) => {
                self.amenities = values.clone();
            }
            (key, value) => {
                return Err(DomainError::InvariantViolation(format!(
                    "answer value {value:?} does not fit question {key:?}"
                )));
            }
        }

        Ok(())
    }

    /// Clears everything quotation-specific while keeping the client
    /// identity, so a follow-up quotation re-asks from the project type.
    pub fn reset_for_new_quotation(&mut self) {
        self.project_type = None;
        self.area_m2 = None;
        self.finish_tier = None;
        self.duration_estimate = None;
        self.budget_estimate = None;
        self.has_lot = None;
        self.additional_rooms = None;
        self.rooms.clear();
        self.amenities.clear();
        self.costs = None;
    }

    pub fn bathroom_count(&self) -> usize {
        self.rooms.iter().filter(|room| room.has_bathroom).count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::catalog::FinishTier;
    use crate::domain::question::{Answer, AnswerValue, QuestionKey};
    use crate::errors::DomainError;

    use super::QuotationRecord;

    fn record() -> QuotationRecord {
        QuotationRecord::new(Utc::now())
    }

    #[test]
    fn answers_populate_their_record_fields() {
        let mut record = record();
        record
            .apply_answer(&Answer::new(
                QuestionKey::ClientName,
                AnswerValue::Text("Mariana".to_string()),
            ))
            .expect("name");
        record
            .apply_answer(&Answer::new(QuestionKey::SquareMeters, AnswerValue::Integer(120)))
            .expect("area");
        record
            .apply_answer(&Answer::new(
                QuestionKey::FinishTier,
                AnswerValue::Choice("Medio".to_string()),
            ))
            .expect("tier");

        assert_eq!(record.client_name.as_deref(), Some("Mariana"));
        assert_eq!(record.area_m2, Some(Decimal::from(120_u32)));
        assert_eq!(record.finish_tier, Some(FinishTier::Medio));
    }

    #[test]
    fn rooms_grow_in_interview_order() {
        let mut record = record();
        record
            .apply_answer(&Answer::new(
                QuestionKey::RoomBed(0),
                AnswerValue::Choice("Queen".to_string()),
            ))
            .expect("principal bed");
        record
            .apply_answer(&Answer::new(
                QuestionKey::RoomBed(1),
                AnswerValue::Choice("Doble".to_string()),
            ))
            .expect("second bed");
        record
            .apply_answer(&Answer::new(QuestionKey::RoomBathroom(1), AnswerValue::Boolean(true)))
            .expect("second bathroom");

        assert_eq!(record.rooms.len(), 2);
        assert_eq!(record.rooms[0].bed_size, "Queen");
        assert!(!record.rooms[0].has_bathroom);
        assert!(record.rooms[1].has_bathroom);
        assert_eq!(record.bathroom_count(), 1);
    }

    #[test]
    fn bathroom_before_bed_is_an_invariant_violation() {
        let mut record = record();
        let error = record
            .apply_answer(&Answer::new(QuestionKey::RoomBathroom(1), AnswerValue::Boolean(true)))
            .expect_err("bathroom without bed must fail");

        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn out_of_order_bed_answer_is_rejected() {
        let mut record = record();
        let error = record
            .apply_answer(&Answer::new(
                QuestionKey::RoomBed(2),
                AnswerValue::Choice("King".to_string()),
            ))
            .expect_err("room 2 before rooms 0 and 1 must fail");

        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn mismatched_answer_value_is_rejected() {
        let mut record = record();
        let error = record
            .apply_answer(&Answer::new(QuestionKey::ClientAge, AnswerValue::Boolean(true)))
            .expect_err("boolean can never answer the age question");

        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn reset_keeps_identity_and_drops_project_facts() {
        let mut record = record();
        record
            .apply_answer(&Answer::new(
                QuestionKey::ClientName,
                AnswerValue::Text("Andrés".to_string()),
            ))
            .expect("name");
        record
            .apply_answer(&Answer::new(QuestionKey::ClientAge, AnswerValue::Integer(41)))
            .expect("age");
        record
            .apply_answer(&Answer::new(QuestionKey::SquareMeters, AnswerValue::Integer(200)))
            .expect("area");
        record
            .apply_answer(&Answer::new(
                QuestionKey::RoomBed(0),
                AnswerValue::Choice("King".to_string()),
            ))
            .expect("bed");
        record
            .apply_answer(&Answer::new(
                QuestionKey::Amenities,
                AnswerValue::Selection(BTreeSet::from(["Sauna".to_string()])),
            ))
            .expect("amenities");

        record.reset_for_new_quotation();

        assert_eq!(record.client_name.as_deref(), Some("Andrés"));
        assert_eq!(record.client_age, Some(41));
        assert_eq!(record.area_m2, None);
        assert!(record.rooms.is_empty());
        assert!(record.amenities.is_empty());
        assert!(record.costs.is_none());
    }

    #[test]
    fn record_serializes_with_stable_field_names() {
        let mut record = record();
        record
            .apply_answer(&Answer::new(QuestionKey::SquareMeters, AnswerValue::Integer(120)))
            .expect("area");

        let json = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(json["area_m2"], serde_json::json!("120"));
        assert!(json["rooms"].as_array().expect("rooms array").is_empty());
        assert!(json.get("client_name").is_some());
    }
}
