//! Load planning for trailer floors.
//!
//! This module implements the deterministic shelf heuristic that lays pallets
//! onto the trailer floor:
//! - Orientation resolution per pallet type
//! - Expansion of pallet types into floor units (double stacking halves the count)
//! - Row-by-row greedy placement from the front wall towards the door
//!
//! Registry order is the primary sort key and footprint area the secondary one.
//! Downstream drawings depend on the exact coordinates, so the ordering and row
//! semantics must not be changed to "improve" density.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::geometry::{fits_at, overlapping_pairs};
use crate::model::{
    DEFAULT_MAX_PAYLOAD, Orientation, PalletType, PalletTypeId, PlacedUnit, TrailerPreset,
    TrailerProfile,
};
use crate::types::{Dimensional, Footprint, Point};

/// Configuration for the planner and the defaults the service falls back to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Absolute slack in inches for fit comparisons, 0.0 for a strict guard
    pub fit_tolerance: f64,
    /// Trailer used when a request names none
    pub default_trailer: TrailerPreset,
    /// Payload limit used when a request names none
    pub default_max_payload: f64,
}

impl PlannerConfig {
    pub const DEFAULT_FIT_TOLERANCE: f64 = 0.0;
    pub const DEFAULT_TRAILER: TrailerPreset = TrailerPreset::FiftyThreeFoot;
    pub const DEFAULT_MAX_PAYLOAD: f64 = DEFAULT_MAX_PAYLOAD;

    /// Creates a builder for a customized configuration.
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::default()
    }

    /// Trailer profile used when a request does not describe one.
    pub fn default_profile(&self) -> TrailerProfile {
        self.default_trailer.profile(self.default_max_payload)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            fit_tolerance: Self::DEFAULT_FIT_TOLERANCE,
            default_trailer: Self::DEFAULT_TRAILER,
            default_max_payload: Self::DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Builder for PlannerConfig.
#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    pub fn fit_tolerance(mut self, tolerance: f64) -> Self {
        self.config.fit_tolerance = tolerance;
        self
    }

    pub fn default_trailer(mut self, preset: TrailerPreset) -> Self {
        self.config.default_trailer = preset;
        self
    }

    pub fn default_max_payload(mut self, weight: f64) -> Self {
        self.config.default_max_payload = weight;
        self
    }

    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

/// Identical floor units of one pallet type that still wait for a spot.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorUnitRun {
    pub footprint: Footprint,
    pub area: f64,
    /// Position of the source pallet type in the registry
    pub type_order: usize,
    pub source_type_id: PalletTypeId,
    pub color_tag: u8,
    pub label: String,
    /// Units of this run not placed yet
    pub count: usize,
}

impl FloorUnitRun {
    fn place_at(&self, position: Point) -> PlacedUnit {
        PlacedUnit {
            across_pos: position.across,
            along_pos: position.along,
            across: self.footprint.across,
            along: self.footprint.along,
            source_type_id: self.source_type_id.clone(),
            color_tag: self.color_tag,
            label: self.label.clone(),
        }
    }
}

/// Summary of one closed row of the layout.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct RowSummary {
    /// Zero-based row number, counted from the front wall
    pub index: usize,
    pub along_pos: f64,
    /// Deepest unit placed in the row
    pub depth: f64,
    /// Sum of the across extents placed in the row
    pub used_across: f64,
    pub unit_count: usize,
}

/// Result of a planning run.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementResult {
    pub placed: Vec<PlacedUnit>,
    /// Floor units that could not be placed
    pub overflow_count: usize,
    pub rows: Vec<RowSummary>,
}

impl PlacementResult {
    fn empty() -> Self {
        Self {
            placed: Vec::new(),
            overflow_count: 0,
            rows: Vec::new(),
        }
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    /// Number of units placed for one pallet type.
    pub fn placed_for(&self, type_id: &PalletTypeId) -> usize {
        self.placed
            .iter()
            .filter(|unit| &unit.source_type_id == type_id)
            .count()
    }

    /// Floor area covered by placed units.
    pub fn occupied_area(&self) -> f64 {
        self.placed.iter().map(|unit| unit.area()).sum()
    }

    /// Checks whether any two placed units overlap.
    pub fn has_overlaps(&self) -> bool {
        !overlapping_pairs(&self.placed).is_empty()
    }
}

/// Events emitted while planning, for live visualization.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new row is opened at the along cursor.
    RowStarted { row: usize, along_pos: f64 },
    /// A floor unit was placed.
    UnitPlaced {
        row: usize,
        type_id: PalletTypeId,
        across_pos: f64,
        along_pos: f64,
        across: f64,
        along: f64,
    },
    /// A row was closed and the along cursor advanced by its depth.
    RowClosed { summary: RowSummary },
    /// Planning finished.
    Finished { placed: usize, overflow: usize },
}

/// Resolves which pallet side lies across the trailer.
///
/// `Auto` compares how many pallets fit side by side in either orientation
/// and keeps width-across on a tie.
///
/// # Parameters
/// * `pallet` - Pallet type to resolve
/// * `trailer` - Trailer whose interior width decides `Auto`
///
/// # Returns
/// The footprint as (across, along)
pub fn resolve_orientation(pallet: &PalletType, trailer: &TrailerProfile) -> Footprint {
    let width_across = pallet.physical_footprint();
    match pallet.orientation {
        Orientation::WidthAcrossTrailerWidth => width_across,
        Orientation::LengthAcrossTrailerWidth => width_across.swapped(),
        Orientation::Auto => {
            let width_fit = (trailer.interior_width / pallet.footprint_width).floor();
            let length_fit = (trailer.interior_width / pallet.footprint_length).floor();
            if width_fit >= length_fit {
                width_across
            } else {
                width_across.swapped()
            }
        }
    }
}

/// Expands pallet types into runs of floor units in registry order.
///
/// Inert pallet types (no quantity or a non-positive side) contribute nothing.
/// Each remaining type yields one run whose `count` is its floor unit count.
pub fn expand_floor_units(types: &[PalletType], trailer: &TrailerProfile) -> Vec<FloorUnitRun> {
    types
        .iter()
        .enumerate()
        .filter_map(|(type_order, pallet)| {
            let count = pallet.floor_units();
            if count == 0 {
                return None;
            }
            let footprint = resolve_orientation(pallet, trailer);
            Some(FloorUnitRun {
                footprint,
                area: footprint.area(),
                type_order,
                source_type_id: pallet.id.clone(),
                color_tag: pallet.color_tag,
                label: pallet.label.clone(),
                count,
            })
        })
        .collect()
}

/// Plans the trailer floor with the default configuration.
///
/// # Parameters
/// * `types` - Pallet types in registry order
/// * `trailer` - Target trailer
///
/// # Returns
/// `PlacementResult` with placed units, rows and overflow count
pub fn pack_pallets(types: &[PalletType], trailer: &TrailerProfile) -> PlacementResult {
    pack_pallets_with_config(types, trailer, PlannerConfig::default())
}

/// Plans the trailer floor with a custom configuration.
pub fn pack_pallets_with_config(
    types: &[PalletType],
    trailer: &TrailerProfile,
    config: PlannerConfig,
) -> PlacementResult {
    pack_pallets_with_progress(types, trailer, config, |_| {})
}

/// Plans the trailer floor and reports every step through a callback.
///
/// Rows are filled front to back. Within a row the remaining units are scanned
/// once in sorted order and every unit that still fits is placed. A row that
/// places nothing ends the run; everything left over is overflow.
pub fn pack_pallets_with_progress(
    types: &[PalletType],
    trailer: &TrailerProfile,
    config: PlannerConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PlacementResult {
    let mut runs = expand_floor_units(types, trailer);
    let mut remaining: usize = runs.iter().map(|run| run.count).sum();
    if remaining == 0 {
        on_event(&PackEvent::Finished {
            placed: 0,
            overflow: 0,
        });
        return PlacementResult::empty();
    }

    // Stable sort: registry order first, larger footprints first within a type.
    runs.sort_by(|a, b| {
        a.type_order
            .cmp(&b.type_order)
            .then_with(|| b.area.partial_cmp(&a.area).unwrap_or(Ordering::Equal))
    });

    let mut result = PlacementResult::empty();
    let mut along_pos = 0.0;

    while remaining > 0 && along_pos < trailer.interior_length {
        let row = result.rows.len();
        on_event(&PackEvent::RowStarted { row, along_pos });

        let mut across_pos = 0.0;
        let mut depth: f64 = 0.0;
        let mut unit_count = 0;

        for run in runs.iter_mut() {
            // Units of a run are identical: once one misses, the rest miss too.
            while run.count > 0 {
                let cursor = Point::new(across_pos, along_pos);
                if !fits_at(cursor, run.footprint, trailer, config.fit_tolerance) {
                    break;
                }
                let placed = run.place_at(cursor);
                on_event(&PackEvent::UnitPlaced {
                    row,
                    type_id: placed.source_type_id.clone(),
                    across_pos: placed.across_pos,
                    along_pos: placed.along_pos,
                    across: placed.across,
                    along: placed.along,
                });
                result.placed.push(placed);
                across_pos += run.footprint.across;
                depth = depth.max(run.footprint.along);
                run.count -= 1;
                unit_count += 1;
            }
        }
        remaining -= unit_count;

        if unit_count == 0 {
            debug!(row, along_pos, remaining, "row placed nothing, stopping");
            break;
        }

        let summary = RowSummary {
            index: row,
            along_pos,
            depth,
            used_across: across_pos,
            unit_count,
        };
        on_event(&PackEvent::RowClosed {
            summary: summary.clone(),
        });
        result.rows.push(summary);
        along_pos += depth;
    }

    result.overflow_count = remaining;
    debug!(
        placed = result.placed.len(),
        overflow = result.overflow_count,
        rows = result.rows.len(),
        "planning finished"
    );
    on_event(&PackEvent::Finished {
        placed: result.placed.len(),
        overflow: result.overflow_count,
    });
    result
}
