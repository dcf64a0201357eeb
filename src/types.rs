//! Common types and traits for 2D trailer floor geometry.
//!
//! All coordinates use the trailer's own axes: `across` runs side to side
//! (0..interior width) and `along` runs from the front wall towards the door
//! (0..interior length).

use std::ops::Add;

/// Extent of a rectangle on the trailer floor after orientation has been resolved.
///
/// # Examples
/// ```
/// use trailer_load_planner::types::Footprint;
///
/// let footprint = Footprint::new(48.0, 40.0);
/// assert_eq!(footprint.area(), 1920.0);
/// assert_eq!(footprint.swapped(), Footprint::new(40.0, 48.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub across: f64,
    pub along: f64,
}

impl Footprint {
    #[inline]
    pub const fn new(across: f64, along: f64) -> Self {
        Self { across, along }
    }

    /// Floor area covered by the footprint.
    #[inline]
    pub fn area(&self) -> f64 {
        self.across * self.along
    }

    /// Same rectangle turned by 90 degrees.
    #[inline]
    pub const fn swapped(&self) -> Self {
        Self::new(self.along, self.across)
    }

    /// Checks if both extents are positive and finite.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.across > 0.0 && self.along > 0.0 && self.across.is_finite() && self.along.is_finite()
    }
}

/// A point on the trailer floor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub across: f64,
    pub along: f64,
}

impl Point {
    #[inline]
    pub const fn new(across: f64, along: f64) -> Self {
        Self { across, along }
    }
}

impl Add<Footprint> for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Footprint) -> Self::Output {
        Self::new(self.across + rhs.across, self.along + rhs.along)
    }
}

/// Trait for anything that occupies floor space.
pub trait Dimensional {
    /// Returns the resolved footprint.
    fn footprint(&self) -> Footprint;

    /// Calculates the occupied floor area.
    fn area(&self) -> f64 {
        self.footprint().area()
    }
}

/// Trait for objects anchored at a position on the trailer floor.
pub trait Positioned {
    /// Returns the anchor (minimum across, minimum along corner).
    fn position(&self) -> Point;
}

/// Axis-aligned rectangle on the trailer floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Minimum corner (anchor)
    pub min: Point,
    /// Maximum corner (anchor + footprint)
    pub max: Point,
}

impl Rect {
    #[inline]
    pub fn from_position_and_footprint(position: Point, footprint: Footprint) -> Self {
        Self {
            min: position,
            max: position + footprint,
        }
    }

    /// Half-open intersection test: rectangles that only touch do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.across <= other.min.across
            || other.max.across <= self.min.across
            || self.max.along <= other.min.along
            || other.max.along <= self.min.along)
    }
}

/// Rounds half-way values up (towards positive infinity).
///
/// Percentages shown to dispatchers have always been rounded this way, so
/// 12.5 % reads as 13 % and -0.5 reads as 0.
#[inline]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_area_and_swap() {
        let footprint = Footprint::new(48.0, 40.0);
        assert_eq!(footprint.area(), 1920.0);
        assert_eq!(footprint.swapped(), Footprint::new(40.0, 48.0));
    }

    #[test]
    fn test_footprint_validity() {
        assert!(Footprint::new(1.0, 1.0).is_valid());
        assert!(!Footprint::new(0.0, 1.0).is_valid());
        assert!(!Footprint::new(1.0, -2.0).is_valid());
        assert!(!Footprint::new(f64::NAN, 1.0).is_valid());
        assert!(!Footprint::new(1.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_rect_touching_edges_do_not_intersect() {
        let size = Footprint::new(40.0, 48.0);
        let a = Rect::from_position_and_footprint(Point::default(), size);
        let b = Rect::from_position_and_footprint(Point::new(40.0, 0.0), size);
        let c = Rect::from_position_and_footprint(Point::new(20.0, 10.0), size);

        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(12.5), 13.0);
        assert_eq!(round_half_up(12.49), 12.0);
        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(44.4444), 44.0);
    }
}
