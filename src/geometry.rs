//! Geometric helpers for placement checks on the trailer floor.
//!
//! The planner uses `fits_at` as its only placement guard; the overlap helpers
//! let callers and tests verify a finished layout.

use crate::model::{PlacedUnit, TrailerProfile};
use crate::types::{Footprint, Point};

/// Checks if a footprint anchored at `position` stays inside the trailer.
///
/// # Parameters
/// * `position` - Candidate anchor (across cursor, along cursor)
/// * `footprint` - Resolved extents of the floor unit
/// * `trailer` - Interior envelope
/// * `tolerance` - Absolute slack in inches
///
/// # Returns
/// `true` if both far edges are within the interior width and length
pub fn fits_at(
    position: Point,
    footprint: Footprint,
    trailer: &TrailerProfile,
    tolerance: f64,
) -> bool {
    let far = position + footprint;
    far.across <= trailer.interior_width + tolerance
        && far.along <= trailer.interior_length + tolerance
}

/// Checks if two placed units overlap.
///
/// Units that merely share an edge do not overlap.
pub fn intersects(a: &PlacedUnit, b: &PlacedUnit) -> bool {
    a.bounds().intersects(&b.bounds())
}

/// Checks if a placed unit lies fully inside the trailer.
pub fn within_trailer(unit: &PlacedUnit, trailer: &TrailerProfile, tolerance: f64) -> bool {
    unit.across_pos >= -tolerance
        && unit.along_pos >= -tolerance
        && fits_at(
            Point::new(unit.across_pos, unit.along_pos),
            Footprint::new(unit.across, unit.along),
            trailer,
            tolerance,
        )
}

/// Index pairs of placed units that overlap each other.
pub fn overlapping_pairs(placed: &[PlacedUnit]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in placed.iter().enumerate() {
        for (j, b) in placed.iter().enumerate().skip(i + 1) {
            if intersects(a, b) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PalletTypeId;

    fn unit(across_pos: f64, along_pos: f64, across: f64, along: f64) -> PlacedUnit {
        PlacedUnit {
            across_pos,
            along_pos,
            across,
            along,
            source_type_id: PalletTypeId::new("pt-1"),
            color_tag: 0,
            label: "Pallet 1".to_string(),
        }
    }

    #[test]
    fn fits_at_respects_both_axes() {
        let trailer = TrailerProfile::new(100.0, 50.0, 1000.0);
        let footprint = Footprint::new(25.0, 40.0);

        assert!(fits_at(Point::new(25.0, 60.0), footprint, &trailer, 0.0));
        assert!(!fits_at(Point::new(26.0, 0.0), footprint, &trailer, 0.0));
        assert!(!fits_at(Point::new(0.0, 61.0), footprint, &trailer, 0.0));
    }

    #[test]
    fn side_by_side_units_do_not_intersect() {
        let a = unit(0.0, 0.0, 48.0, 40.0);
        let b = unit(48.0, 0.0, 48.0, 40.0);
        let c = unit(24.0, 20.0, 48.0, 40.0);

        assert!(!intersects(&a, &b));
        assert!(intersects(&a, &c));
        assert_eq!(overlapping_pairs(&[a, b, c]), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn within_trailer_rejects_negative_anchor() {
        let trailer = TrailerProfile::new(100.0, 50.0, 1000.0);
        assert!(within_trailer(&unit(0.0, 0.0, 50.0, 100.0), &trailer, 0.0));
        assert!(!within_trailer(&unit(-1.0, 0.0, 10.0, 10.0), &trailer, 0.0));
        assert!(!within_trailer(&unit(45.0, 0.0, 10.0, 10.0), &trailer, 0.0));
    }
}
