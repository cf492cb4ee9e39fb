use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{bathroom_area_m2, Catalog};
use crate::domain::question::QuestionKey;
use crate::domain::record::QuotationRecord;
use crate::errors::DomainError;

/// Informational floor-area survey. Total over any record, including a
/// partially answered one; these areas never feed the cost formula.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub rooms_m2: Decimal,
    pub bathrooms_m2: Decimal,
    pub amenities_m2: Decimal,
}

impl AreaBreakdown {
    pub fn total(&self) -> Decimal {
        self.rooms_m2 + self.bathrooms_m2 + self.amenities_m2
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub areas: AreaBreakdown,
    pub construction_cost: Decimal,
    pub design_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

pub trait PricingEngine: Send + Sync {
    fn survey_areas(&self, record: &QuotationRecord) -> AreaBreakdown;
    fn price(&self, record: &QuotationRecord) -> Result<CostBreakdown, DomainError>;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn survey_areas(&self, record: &QuotationRecord) -> AreaBreakdown {
        survey_record_areas(record)
    }

    fn price(&self, record: &QuotationRecord) -> Result<CostBreakdown, DomainError> {
        price_record(record)
    }
}

pub fn survey_record_areas(record: &QuotationRecord) -> AreaBreakdown {
    let catalog = Catalog::global();

    let rooms_m2 =
        record.rooms.iter().map(|room| catalog.bed_area_m2(&room.bed_size)).sum::<Decimal>();
    let bathrooms_m2 = bathroom_area_m2() * Decimal::from(record.bathroom_count() as u64);
    let amenities_m2 =
        record.amenities.iter().map(|name| catalog.amenity_area_m2(name)).sum::<Decimal>();

    AreaBreakdown { rooms_m2, bathrooms_m2, amenities_m2 }
}

pub fn price_record(record: &QuotationRecord) -> Result<CostBreakdown, DomainError> {
    price_record_with_trace(record).map(|(breakdown, _)| breakdown)
}

pub fn price_record_with_trace(
    record: &QuotationRecord,
) -> Result<(CostBreakdown, PricingTrace), DomainError> {
    let mut missing = Vec::new();
    if record.area_m2.is_none() {
        missing.push(QuestionKey::SquareMeters.storage_key());
    }
    if record.finish_tier.is_none() {
        missing.push(QuestionKey::FinishTier.storage_key());
    }
    let (Some(area_m2), Some(tier)) = (record.area_m2, record.finish_tier) else {
        return Err(DomainError::MissingPricingInputs { missing });
    };

    let construction_cost = area_m2 * tier.price_per_m2();
    let design_cost = construction_cost * Decimal::new(10, 2);
    let total_cost = construction_cost + design_cost;

    let trace = PricingTrace {
        currency: "COP".to_string(),
        steps: vec![
            PricingTraceStep {
                stage: "construction".to_string(),
                detail: format!("{area_m2} m2 * {} ({})", tier.price_per_m2(), tier.label()),
                amount: construction_cost,
            },
            PricingTraceStep {
                stage: "design".to_string(),
                detail: "10% of construction".to_string(),
                amount: design_cost,
            },
            PricingTraceStep {
                stage: "total".to_string(),
                detail: "construction + design".to_string(),
                amount: total_cost,
            },
        ],
    };

    let breakdown = CostBreakdown {
        areas: survey_record_areas(record),
        construction_cost,
        design_cost,
        total_cost,
    };

    Ok((breakdown, trace))
}

/// Whole-peso COP rendering with dot thousand separators, es-CO style:
/// `$342.000.000 COP`.
pub fn format_cop(amount: Decimal) -> String {
    let rounded = amount.round();
    let raw = rounded.trunc().to_string();
    let digits = raw.strip_prefix('-').unwrap_or(&raw);
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();
    if raw.starts_with('-') {
        format!("-${grouped} COP")
    } else {
        format!("${grouped} COP")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::catalog::FinishTier;
    use crate::domain::record::{QuotationRecord, Room};
    use crate::errors::DomainError;

    use super::{
        price_record, price_record_with_trace, survey_record_areas, DeterministicPricingEngine,
        PricingEngine,
    };

    fn record_with(area: u32, tier: FinishTier) -> QuotationRecord {
        let mut record = QuotationRecord::new(Utc::now());
        record.area_m2 = Some(Decimal::from(area));
        record.finish_tier = Some(tier);
        record
    }

    #[test]
    fn medio_tier_at_120_m2_prices_the_published_example() {
        let record = record_with(120, FinishTier::Medio);
        let costs = price_record(&record).expect("complete inputs price");

        assert_eq!(costs.construction_cost, Decimal::from(342_000_000_u64));
        assert_eq!(costs.design_cost, Decimal::from(34_200_000_u64));
        assert_eq!(costs.total_cost, Decimal::from(376_200_000_u64));
    }

    #[test]
    fn pricing_is_idempotent_for_an_unchanged_record() {
        let record = record_with(87, FinishTier::Premium);
        let first = price_record(&record).expect("first run");
        let second = price_record(&record).expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn missing_inputs_fail_fast_and_name_the_questions() {
        let record = QuotationRecord::new(Utc::now());
        let error = price_record(&record).expect_err("empty record cannot price");

        let DomainError::MissingPricingInputs { missing } = error else {
            panic!("expected MissingPricingInputs, got {error:?}");
        };
        assert_eq!(missing, vec!["square_meters".to_string(), "finish_tier".to_string()]);
    }

    #[test]
    fn area_survey_matches_the_room_and_bathroom_tables() {
        let mut record = QuotationRecord::new(Utc::now());
        record.rooms = vec![
            Room { bed_size: "Queen".to_string(), has_bathroom: false },
            Room { bed_size: "Doble".to_string(), has_bathroom: true },
            Room { bed_size: "Sencilla".to_string(), has_bathroom: false },
        ];

        let areas = survey_record_areas(&record);
        assert_eq!(areas.rooms_m2, Decimal::from(48_u32));
        assert_eq!(areas.bathrooms_m2, Decimal::new(35, 1));
        assert_eq!(areas.amenities_m2, Decimal::ZERO);
        assert_eq!(areas.total(), Decimal::new(515, 1));
    }

    #[test]
    fn unknown_amenities_survey_as_zero_area() {
        let mut record = QuotationRecord::new(Utc::now());
        record.amenities =
            BTreeSet::from(["Piscina gigante".to_string(), "Sauna".to_string()]);

        let areas = survey_record_areas(&record);
        assert_eq!(areas.amenities_m2, Decimal::from(9_u32));
    }

    #[test]
    fn unknown_bed_sizes_survey_with_the_default_area() {
        let mut record = QuotationRecord::new(Utc::now());
        record.rooms = vec![Room { bed_size: "Litera triple".to_string(), has_bathroom: false }];

        let areas = survey_record_areas(&record);
        assert_eq!(areas.rooms_m2, Decimal::from(16_u32));
    }

    #[test]
    fn survey_succeeds_on_a_partial_record() {
        let record = QuotationRecord::new(Utc::now());
        let areas = survey_record_areas(&record);
        assert_eq!(areas.total(), Decimal::ZERO);
    }

    #[test]
    fn engine_trait_and_free_function_agree() {
        let record = record_with(120, FinishTier::Medio);
        let engine = DeterministicPricingEngine;

        let from_trait = engine.price(&record).expect("trait price");
        let from_free = price_record(&record).expect("free price");
        assert_eq!(from_trait, from_free);
    }

    #[test]
    fn trace_walks_construction_design_total() {
        let record = record_with(120, FinishTier::Medio);
        let (_, trace) = price_record_with_trace(&record).expect("trace");

        assert_eq!(trace.currency, "COP");
        let stages = trace.steps.iter().map(|step| step.stage.as_str()).collect::<Vec<_>>();
        assert_eq!(stages, vec!["construction", "design", "total"]);
        assert_eq!(trace.steps[2].amount, Decimal::from(376_200_000_u64));
    }

    #[test]
    fn costs_never_include_survey_areas_in_the_formula() {
        let mut record = record_with(120, FinishTier::Medio);
        record.rooms = vec![Room { bed_size: "King".to_string(), has_bathroom: true }];
        record.amenities = BTreeSet::from(["Piscina grande".to_string()]);

        let costs = price_record(&record).expect("complete inputs price");
        // Same construction figure as a record with no rooms or amenities.
        assert_eq!(costs.construction_cost, Decimal::from(342_000_000_u64));
        assert!(costs.areas.total() > Decimal::ZERO);
    }

    #[test]
    fn cop_formatting_groups_thousands_with_dots() {
        assert_eq!(super::format_cop(Decimal::from(376_200_000_u64)), "$376.200.000 COP");
        assert_eq!(super::format_cop(Decimal::from(950_u32)), "$950 COP");
        assert_eq!(super::format_cop(Decimal::ZERO), "$0 COP");
    }
}
