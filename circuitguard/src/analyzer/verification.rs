//! Installation-level checks: distribution board verification fields and
//! estimated earth fault loop impedance per circuit.

use crate::analyzer::rules::{Issue, RuleContext, Severity};
use crate::calc::estimate::{calculate_design_current, estimate_cable_size, suggest_mcb_rating};
use crate::calc::zs::{estimated_zs, expected_r1_r2, max_zs, max_zs_measured};
use crate::design::{
    BoardSet, DesignCircuit, DistributionBoard, EarthingSystem, InstallationDesign, SpdStatus,
};
use crate::schedule::normalise::{format_size, twin_and_earth_cpc_for};

/// Design-level check ids and names, alongside the per-circuit rules.
pub const DESIGN_CHECKS: &[(&str, &str)] = &[
    ("board_structure", "Board Structure"),
    ("board_zdb", "Board Zdb Limit"),
    ("board_polarity", "Board Polarity Confirmation"),
    ("board_ipf", "Device Breaking Capacity"),
    ("board_spd", "SPD Status"),
    ("loop_impedance", "Estimated Zs Limit"),
];

fn board_label(board: &DistributionBoard) -> String {
    if board.name.is_empty() {
        board.id.clone()
    } else {
        board.name.clone()
    }
}

/// Verification checks for every board in the design, judged against the
/// effective earthing system (which may override the design's own).
pub fn check_boards<F>(
    design: &InstallationDesign,
    earthing: EarthingSystem,
    enabled: F,
) -> Vec<Issue>
where
    F: Fn(&str) -> bool,
{
    let mut issues = Vec::new();
    if design.boards.is_empty() {
        return issues;
    }

    if enabled("board_structure") {
        if let Err(e) = BoardSet::from_boards(design.boards.clone()) {
            issues.push(
                Issue::new("board_structure", Severity::Error, format!("Invalid board layout: {}", e))
                    .with_suggestion("Keep exactly one main board and make every fedFrom refer to a known board"),
            );
        }
    }

    for board in &design.boards {
        let label = board_label(board);

        if enabled("board_zdb") {
            if let (Some(zdb), Some(limit)) = (board.zdb, earthing.typical_max_ze()) {
                if zdb > limit {
                    issues.push(
                        Issue::new(
                            "board_zdb",
                            Severity::Warning,
                            format!(
                                "Zdb {:.2}Ω exceeds the typical maximum Ze of {:.2}Ω for {}",
                                zdb,
                                limit,
                                earthing.label()
                            ),
                        )
                        .with_component(label.clone())
                        .with_suggestion("Check the main earthing conductor and sub-main CPC continuity"),
                    );
                }
            }
        }

        if enabled("board_polarity") && !board.confirmed_correct_polarity {
            issues.push(
                Issue::new("board_polarity", Severity::Warning, "Correct polarity not confirmed")
                    .with_component(label.clone()),
            );
        }

        if enabled("board_ipf") {
            if let Some(ipf) = board.ipf {
                for circuit in board.circuits_fed(&design.circuits) {
                    let Some(ka) = circuit.ka_rating else {
                        continue;
                    };
                    if ipf > ka {
                        issues.push(
                            Issue::new(
                                "board_ipf",
                                Severity::Error,
                                format!(
                                    "Prospective fault current {:.2}kA at {} exceeds the {:.1}kA device rating",
                                    ipf, label, ka
                                ),
                            )
                            .with_component(circuit.input.name.clone())
                            .with_suggestion("Fit a device with a higher breaking capacity"),
                        );
                    }
                }
            }
        }

        if enabled("board_spd") && board.spd_status == SpdStatus::Unchecked {
            issues.push(
                Issue::new("board_spd", Severity::Info, "SPD status not recorded")
                    .with_component(label),
            );
        }
    }

    issues
}

/// Ze at the origin of a circuit: its board's Zdb, or the supply Ze.
fn ze_for(design: &InstallationDesign, circuit: &DesignCircuit) -> Option<f64> {
    let board = match circuit.board_id.as_deref() {
        Some(id) => design.boards.iter().find(|b| b.id == id),
        None => design.boards.iter().find(|b| b.is_main()),
    };
    board.and_then(|b| b.zdb).or(design.ze)
}

/// Estimated Zs per circuit against the Table 41.3 maximum.
pub fn check_loop_impedance(design: &InstallationDesign, ctx: &RuleContext) -> Vec<Issue> {
    let mut issues = Vec::new();

    for circuit in &design.circuits {
        let input = &circuit.input;
        if !ctx.has_valid_inputs(input) {
            continue;
        }
        let Some(ze) = ze_for(design, circuit) else {
            continue;
        };

        let ib = calculate_design_current(input.load_power, ctx.voltage, input.phases);
        let rating = circuit.device_rating.unwrap_or_else(|| suggest_mcb_rating(ib));
        let live = ctx
            .cables
            .find_optimal_cable_size(&input.cable_type, f64::from(rating), &input.installation_method)
            .map(|s| s.size)
            .unwrap_or_else(|| estimate_cable_size(ib));
        let cpc = if input.cable_type == "pvc-twin-earth" {
            twin_and_earth_cpc_for(&format_size(live)).and_then(|s| s.parse::<f64>().ok())
        } else {
            Some(live)
        };
        let Some(r1_r2) = cpc.and_then(|cpc| expected_r1_r2(live, cpc, input.cable_length)) else {
            tracing::debug!("No resistance data for '{}' at {}mm²", input.name, live);
            continue;
        };
        let (Some(limit), Some(measured_limit)) = (
            max_zs(circuit.device_curve, rating),
            max_zs_measured(circuit.device_curve, rating),
        ) else {
            continue;
        };

        let zs = estimated_zs(ze, r1_r2);
        let device = format!("{:?}{}", circuit.device_curve, rating);
        if zs > limit {
            let severity = if input.rcd_protection {
                Severity::Warning
            } else {
                Severity::Error
            };
            let mut issue = Issue::new(
                "loop_impedance",
                severity,
                format!(
                    "Estimated Zs {:.2}Ω exceeds the {:.2}Ω maximum for a {} device",
                    zs, limit, device
                ),
            )
            .with_component(input.name.clone());
            issue = if input.rcd_protection {
                issue.with_suggestion("Disconnection relies on the RCD; confirm its operating time")
            } else {
                issue.with_suggestion("Increase the CPC size, shorten the run or add RCD protection")
            };
            issues.push(issue);
        } else if zs > measured_limit {
            issues.push(
                Issue::new(
                    "loop_impedance",
                    Severity::Suggestion,
                    format!(
                        "Estimated Zs {:.2}Ω is above the {:.2}Ω measured-value limit for a {} device",
                        zs, measured_limit, device
                    ),
                )
                .with_component(input.name.clone())
                .with_suggestion("Expect a marginal test result; consider a larger cable"),
            );
        }
    }

    issues
}
