//! Utilization and load-status reporting.
//!
//! Turns a placement result plus the full pallet registry into the figures the
//! dispatch office reads off the load sheet: pallet count, weight, floor usage,
//! and whether the load is OK, over the payload limit, or does not fit.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{PalletType, PalletTypeId, TrailerProfile};
use crate::planner::PlacementResult;
use crate::types::round_half_up;

/// Weight percentage above which the load is flagged for attention.
pub const WEIGHT_CAUTION_PERCENT: u32 = 85;

/// Overall verdict of a planned load.
///
/// Overweight is considered worse than not fitting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Ok,
    WontFit,
    Overweight,
}

impl LoadStatus {
    /// Combines the two independent checks, overweight taking priority.
    pub fn from_checks(is_overweight: bool, has_overflow: bool) -> Self {
        if is_overweight {
            LoadStatus::Overweight
        } else if has_overflow {
            LoadStatus::WontFit
        } else {
            LoadStatus::Ok
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LoadStatus::Ok => "ok",
            LoadStatus::WontFit => "wont_fit",
            LoadStatus::Overweight => "overweight",
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStatus::Ok => write!(f, "OK"),
            LoadStatus::WontFit => write!(f, "WON'T FIT"),
            LoadStatus::Overweight => write!(f, "OVERWEIGHT"),
        }
    }
}

/// How close the load is to the payload limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeightBand {
    Normal,
    Caution,
}

impl WeightBand {
    pub fn from_percent(weight_percent: u32) -> Self {
        if weight_percent > WEIGHT_CAUTION_PERCENT {
            WeightBand::Caution
        } else {
            WeightBand::Normal
        }
    }
}

/// Per pallet type figures, in registry order.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct TypeBreakdown {
    pub type_id: PalletTypeId,
    pub label: String,
    pub quantity: u32,
    pub floor_units: usize,
    pub placed: usize,
    pub overflow: usize,
    pub total_weight: f64,
}

/// Aggregate figures for one planned load.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct LoadReport {
    /// Physical pallets, independent of double stacking
    pub total_units: u64,
    pub total_weight: f64,
    pub occupied_area: f64,
    pub trailer_area: f64,
    pub space_used_percent: u32,
    /// Capped at 100
    pub weight_percent: u32,
    pub weight_band: WeightBand,
    pub is_overweight: bool,
    pub has_overflow: bool,
    pub overflow_count: usize,
    pub load_status: LoadStatus,
    pub types: Vec<TypeBreakdown>,
}

/// Summarizes a placement result against the full registry and trailer.
///
/// # Parameters
/// * `types` - Every pallet type of the registry, including inert ones
/// * `trailer` - Trailer the result was planned for
/// * `result` - Output of the planner
pub fn summarize(
    types: &[PalletType],
    trailer: &TrailerProfile,
    result: &PlacementResult,
) -> LoadReport {
    let total_units = types.iter().map(|t| u64::from(t.quantity)).sum();
    let total_weight: f64 = types.iter().map(PalletType::total_weight).sum();

    let occupied_area = result.occupied_area();
    let trailer_area = trailer.floor_area();
    let space_used_percent = if trailer_area > 0.0 {
        percent(occupied_area, trailer_area)
    } else {
        0
    };

    let max_payload = trailer.max_payload_weight;
    let weight_percent = if max_payload > 0.0 {
        percent(total_weight, max_payload).min(100)
    } else {
        0
    };

    let is_overweight = total_weight > max_payload;
    let has_overflow = result.overflow_count > 0;

    LoadReport {
        total_units,
        total_weight,
        occupied_area,
        trailer_area,
        space_used_percent,
        weight_percent,
        weight_band: WeightBand::from_percent(weight_percent),
        is_overweight,
        has_overflow,
        overflow_count: result.overflow_count,
        load_status: LoadStatus::from_checks(is_overweight, has_overflow),
        types: breakdown(types, result),
    }
}

fn breakdown(types: &[PalletType], result: &PlacementResult) -> Vec<TypeBreakdown> {
    types
        .iter()
        .map(|pallet| {
            let floor_units = pallet.floor_units();
            let placed = result.placed_for(&pallet.id);
            TypeBreakdown {
                type_id: pallet.id.clone(),
                label: pallet.label.clone(),
                quantity: pallet.quantity,
                floor_units,
                placed,
                overflow: floor_units.saturating_sub(placed),
                total_weight: pallet.total_weight(),
            }
        })
        .collect()
}

// Negative ratios saturate to 0 in the cast.
fn percent(part: f64, whole: f64) -> u32 {
    round_half_up(part / whole * 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Orientation, TrailerPreset};
    use crate::planner::pack_pallets;

    fn pallet(id: &str, quantity: u32, weight_each: f64) -> PalletType {
        PalletType::new(id, id, 48.0, 40.0)
            .with_quantity(quantity)
            .with_weight_each(weight_each)
    }

    fn report_for(types: &[PalletType], trailer: &TrailerProfile) -> LoadReport {
        summarize(types, trailer, &pack_pallets(types, trailer))
    }

    #[test]
    fn status_priority_prefers_overweight() {
        assert_eq!(LoadStatus::from_checks(true, true), LoadStatus::Overweight);
        assert_eq!(LoadStatus::from_checks(true, false), LoadStatus::Overweight);
        assert_eq!(LoadStatus::from_checks(false, true), LoadStatus::WontFit);
        assert_eq!(LoadStatus::from_checks(false, false), LoadStatus::Ok);
    }

    #[test]
    fn totals_count_physical_pallets_of_all_types() {
        let trailer = TrailerPreset::FiftyThreeFoot.profile(45_000.0);
        let types = vec![
            pallet("a", 5, 500.0).with_double_stack(true),
            PalletType::new("flat", "flat", 0.0, 40.0)
                .with_quantity(2)
                .with_weight_each(100.0),
        ];

        let report = report_for(&types, &trailer);
        assert_eq!(report.total_units, 7);
        assert_eq!(report.total_weight, 2700.0);
        assert_eq!(report.types[0].floor_units, 3);
        assert_eq!(report.types[1].floor_units, 0);
    }

    #[test]
    fn space_used_is_rounded_share_of_floor() {
        let trailer = TrailerProfile::new(100.0, 100.0, 1000.0);
        let types = vec![
            PalletType::new("a", "a", 50.0, 25.0)
                .with_quantity(1)
                .with_orientation(Orientation::WidthAcrossTrailerWidth),
        ];

        let report = report_for(&types, &trailer);
        assert_eq!(report.occupied_area, 1250.0);
        // 12.5 % rounds half up.
        assert_eq!(report.space_used_percent, 13);
    }

    #[test]
    fn zero_trailer_area_reports_zero_space() {
        let trailer = TrailerProfile::new(0.0, 98.5, 45_000.0);
        let report = report_for(&[pallet("a", 3, 100.0)], &trailer);
        assert_eq!(report.space_used_percent, 0);
        assert_eq!(report.load_status, LoadStatus::WontFit);
        assert_eq!(report.types[0].overflow, 3);
    }

    #[test]
    fn weight_percent_is_capped_at_hundred() {
        let trailer = TrailerPreset::FiftyThreeFoot.profile(45_000.0);
        let report = report_for(&[pallet("a", 50, 2000.0)], &trailer);
        assert_eq!(report.weight_percent, 100);
        assert_eq!(report.weight_band, WeightBand::Caution);
        assert!(report.is_overweight);
    }

    #[test]
    fn zero_payload_limit_still_flags_overweight() {
        let trailer = TrailerPreset::FiftyThreeFoot.profile(0.0);
        let report = report_for(&[pallet("a", 1, 10.0)], &trailer);
        assert_eq!(report.weight_percent, 0);
        assert!(report.is_overweight);
        assert_eq!(report.load_status, LoadStatus::Overweight);

        let empty = report_for(&[pallet("a", 1, 0.0)], &trailer);
        assert!(!empty.is_overweight);
    }

    #[test]
    fn weight_band_switches_above_caution_threshold() {
        assert_eq!(WeightBand::from_percent(85), WeightBand::Normal);
        assert_eq!(WeightBand::from_percent(86), WeightBand::Caution);
    }

    #[test]
    fn breakdown_splits_overflow_by_type() {
        let trailer = TrailerProfile::new(80.0, 98.5, 45_000.0);
        let types = vec![pallet("first", 4, 100.0), pallet("second", 2, 100.0)];

        let report = report_for(&types, &trailer);
        assert_eq!(report.types[0].placed, 4);
        assert_eq!(report.types[0].overflow, 0);
        assert_eq!(report.types[1].placed, 0);
        assert_eq!(report.types[1].overflow, 2);
        assert_eq!(report.overflow_count, 2);
    }

    #[test]
    fn status_serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&LoadStatus::WontFit).unwrap(), "\"wont_fit\"");
        assert_eq!(LoadStatus::WontFit.to_string(), "WON'T FIT");
    }
}
