use std::time::Instant;

use cotiza_agent::runtime::{IntakeRuntime, TurnReply};
use cotiza_core::catalog::{bathroom_area_m2, Catalog, FinishTier};
use cotiza_core::config::{AppConfig, LoadOptions};
use cotiza_core::pricing::price_record;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

/// Interview script that exercises the full schedule, two extra-room
/// sub-flows included, priced at 120 m2 on the Medio rate.
const WALKTHROUGH_SCRIPT: [&str; 15] = [
    "Soy Valentina Ruiz",
    "35",
    "construcción nueva",
    "120 metros cuadrados",
    "acabados medio",
    "12 meses",
    "aún no tengo presupuesto",
    "sí",
    "2",
    "queen",
    "doble",
    "sí",
    "sencilla",
    "no",
    "ninguno",
];

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, _config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("catalog_integrity"));
            checks.push(skipped("interview_walkthrough"));
            checks.push(skipped("pricing_idempotence"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    checks.push(catalog_check());

    let walkthrough_started = Instant::now();
    match run_walkthrough() {
        Ok(runtime_and_session) => {
            checks.push(SmokeCheck {
                name: "interview_walkthrough",
                status: SmokeStatus::Pass,
                elapsed_ms: walkthrough_started.elapsed().as_millis() as u64,
                message: "scripted interview completed with the published totals".to_string(),
            });
            checks.push(idempotence_check(runtime_and_session));
        }
        Err(message) => {
            checks.push(SmokeCheck {
                name: "interview_walkthrough",
                status: SmokeStatus::Fail,
                elapsed_ms: walkthrough_started.elapsed().as_millis() as u64,
                message,
            });
            checks.push(skipped("pricing_idempotence"));
        }
    }

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn catalog_check() -> SmokeCheck {
    let started = Instant::now();
    let catalog = Catalog::global();

    let message = if catalog.find_bed_size("Doble").is_none() {
        Some("default bed size `Doble` is missing from the catalog".to_string())
    } else if FinishTier::ALL.iter().any(|tier| tier.price_per_m2() <= Decimal::ZERO) {
        Some("a finish tier publishes a non-positive rate".to_string())
    } else if bathroom_area_m2() <= Decimal::ZERO {
        Some("the per-bathroom area constant is non-positive".to_string())
    } else if catalog.amenities().is_empty() {
        Some("the amenity table is empty".to_string())
    } else {
        None
    };

    match message {
        Some(message) => SmokeCheck {
            name: "catalog_integrity",
            status: SmokeStatus::Fail,
            elapsed_ms: started.elapsed().as_millis() as u64,
            message,
        },
        None => SmokeCheck {
            name: "catalog_integrity",
            status: SmokeStatus::Pass,
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: format!(
                "{} bed sizes, {} amenities, {} project types resolvable",
                catalog.bed_sizes().len(),
                catalog.amenities().len(),
                catalog.project_types().len()
            ),
        },
    }
}

fn run_walkthrough() -> Result<(IntakeRuntime, cotiza_agent::session::SessionId), String> {
    let runtime = IntakeRuntime::new();
    let opened = runtime.open_session().map_err(|error| error.to_string())?;

    let mut last = None;
    for message in WALKTHROUGH_SCRIPT {
        last = Some(
            runtime
                .submit_turn(&opened.session_id, message)
                .map_err(|error| format!("turn `{message}` failed: {error}"))?,
        );
    }

    let notice = match last {
        Some(TurnReply::Completed { notice, .. }) => notice,
        other => return Err(format!("interview did not complete, last reply: {other:?}")),
    };

    if notice.costs.construction_cost != Decimal::from(342_000_000_u64) {
        return Err(format!("unexpected construction cost {}", notice.costs.construction_cost));
    }
    if notice.costs.design_cost != Decimal::from(34_200_000_u64) {
        return Err(format!("unexpected design cost {}", notice.costs.design_cost));
    }
    if notice.costs.total_cost != Decimal::from(376_200_000_u64) {
        return Err(format!("unexpected total cost {}", notice.costs.total_cost));
    }
    if notice.costs.areas.rooms_m2 != Decimal::from(48_u64) {
        return Err(format!("unexpected room area {}", notice.costs.areas.rooms_m2));
    }
    if notice.costs.areas.bathrooms_m2 != Decimal::new(35, 1) {
        return Err(format!("unexpected bathroom area {}", notice.costs.areas.bathrooms_m2));
    }

    Ok((runtime, opened.session_id))
}

fn idempotence_check(
    (runtime, session_id): (IntakeRuntime, cotiza_agent::session::SessionId),
) -> SmokeCheck {
    let started = Instant::now();

    let snapshot = match runtime.record(&session_id) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return SmokeCheck {
                name: "pricing_idempotence",
                status: SmokeStatus::Fail,
                elapsed_ms: started.elapsed().as_millis() as u64,
                message: format!("record snapshot failed: {error}"),
            }
        }
    };

    let result = price_record(&snapshot.record)
        .and_then(|first| price_record(&snapshot.record).map(|second| (first, second)));
    match result {
        Ok((first, second)) if first == second => SmokeCheck {
            name: "pricing_idempotence",
            status: SmokeStatus::Pass,
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: "re-pricing an unchanged record is stable".to_string(),
        },
        Ok(_) => SmokeCheck {
            name: "pricing_idempotence",
            status: SmokeStatus::Fail,
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: "two pricing passes over one record disagree".to_string(),
        },
        Err(error) => SmokeCheck {
            name: "pricing_idempotence",
            status: SmokeStatus::Fail,
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: format!("pricing failed: {error}"),
        },
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
