//! Data models for trailer load planning.
//!
//! This module defines the plain data the planner consumes and produces:
//! - `TrailerProfile`: interior envelope and payload limit of a trailer
//! - `PalletType`: one configured pallet row of the load sheet
//! - `PlacedUnit`: a floor unit with its resolved position in the trailer
//!
//! The planner never mutates these values; validation here is only used at the
//! service boundary; the engine itself normalizes bad numbers silently.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Footprint, Point, Positioned, Rect};

/// Number of distinct display colors a pallet type can cycle through.
pub const COLOR_TAG_COUNT: u8 = 8;

/// Footprint of a standard GMA pallet, used for freshly added pallet types.
pub const DEFAULT_PALLET_WIDTH: f64 = 48.0;
pub const DEFAULT_PALLET_LENGTH: f64 = 40.0;
pub const DEFAULT_PALLET_WEIGHT: f64 = 1000.0;

/// Payload limit used when the caller does not supply one (pounds).
pub const DEFAULT_MAX_PAYLOAD: f64 = 45_000.0;

/// Validation error for request data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Duplicate pallet type id: {0}")]
    DuplicateId(String),
    #[error("Order {key} is linked to both {first} and {second}")]
    DuplicateLink {
        key: String,
        first: String,
        second: String,
    },
}

fn validate_finite(value: f64, name: &str) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be a finite number, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be a finite number, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Trailer sizes the dispatch office works with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TrailerPreset {
    #[default]
    #[serde(rename = "53ft")]
    FiftyThreeFoot,
    #[serde(rename = "48ft")]
    FortyEightFoot,
}

impl TrailerPreset {
    pub const ALL: [TrailerPreset; 2] =
        [TrailerPreset::FiftyThreeFoot, TrailerPreset::FortyEightFoot];

    /// Interior length in inches.
    pub fn interior_length(self) -> f64 {
        match self {
            TrailerPreset::FiftyThreeFoot => 636.0,
            TrailerPreset::FortyEightFoot => 576.0,
        }
    }

    /// Interior width in inches.
    pub fn interior_width(self) -> f64 {
        98.5
    }

    pub fn code(self) -> &'static str {
        match self {
            TrailerPreset::FiftyThreeFoot => "53ft",
            TrailerPreset::FortyEightFoot => "48ft",
        }
    }

    /// Builds a trailer profile with the given payload limit.
    pub fn profile(self, max_payload_weight: f64) -> TrailerProfile {
        TrailerProfile::new(self.interior_length(), self.interior_width(), max_payload_weight)
    }
}

impl fmt::Display for TrailerPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TrailerPreset {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "53" | "53ft" | "53'" => Ok(TrailerPreset::FiftyThreeFoot),
            "48" | "48ft" | "48'" => Ok(TrailerPreset::FortyEightFoot),
            other => Err(format!("unknown trailer preset '{}'", other)),
        }
    }
}

/// Interior envelope and payload limit of the target trailer.
///
/// # Fields
/// * `interior_length` - Inches along the travel axis (front wall to door)
/// * `interior_width` - Inches across the trailer
/// * `max_payload_weight` - Payload limit in pounds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "interior_length": 636.0,
    "interior_width": 98.5,
    "max_payload_weight": 45000.0
}))]
pub struct TrailerProfile {
    pub interior_length: f64,
    pub interior_width: f64,
    pub max_payload_weight: f64,
}

impl TrailerProfile {
    /// Creates a profile without validation.
    ///
    /// Non-positive dimensions are allowed and behave as a trailer without
    /// usable floor space.
    pub fn new(interior_length: f64, interior_width: f64, max_payload_weight: f64) -> Self {
        Self {
            interior_length,
            interior_width,
            max_payload_weight,
        }
    }

    /// Rejects NaN and infinite values, which cannot be normalized.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_finite(self.interior_length, "Trailer interior length")?;
        validate_finite(self.interior_width, "Trailer interior width")?;
        validate_weight_value(self.max_payload_weight, "Max payload weight")?;
        Ok(())
    }

    /// Floor area as used for the space utilization figure.
    pub fn floor_area(&self) -> f64 {
        self.interior_length * self.interior_width
    }
}

impl Default for TrailerProfile {
    fn default() -> Self {
        TrailerPreset::default().profile(DEFAULT_MAX_PAYLOAD)
    }
}

/// Opaque identifier of a pallet type, unique within one registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PalletTypeId(pub String);

impl PalletTypeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PalletTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PalletTypeId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for PalletTypeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// External reference to an order line, attached to pallet types for traceability.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderKey(pub String);

impl OrderKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key format used by the order sheets: `"{order number}||{part number}"`.
    ///
    /// # Examples
    /// ```
    /// use trailer_load_planner::model::OrderKey;
    ///
    /// let key = OrderKey::from_parts("IF-1042", "PN-77");
    /// assert_eq!(key.as_str(), "IF-1042||PN-77");
    /// ```
    pub fn from_parts(order_number: &str, part_number: &str) -> Self {
        Self(format!("{}||{}", order_number, part_number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Which physical pallet dimension lies across the trailer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Pick whichever side fits more pallets side by side.
    #[default]
    Auto,
    /// Footprint width runs across the trailer.
    #[serde(alias = "widthwise")]
    WidthAcrossTrailerWidth,
    /// Footprint length runs across the trailer.
    #[serde(alias = "lengthwise")]
    LengthAcrossTrailerWidth,
}

/// One configured pallet row of the load sheet.
///
/// # Fields
/// * `id` - Stable identifier, unique within the registry
/// * `label` - Display name
/// * `footprint_width` / `footprint_length` - Physical pallet sides in inches
/// * `quantity` - Physical pallet count
/// * `weight_each` - Pounds per physical pallet
/// * `orientation` - Axis assignment rule
/// * `double_stack` - Two pallets share one floor footprint
/// * `linked_order_keys` - Orders traced to this pallet type
/// * `color_tag` - Display color index, passed through to placements
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "pt-1",
    "label": "Pallet 1",
    "footprint_width": 48.0,
    "footprint_length": 40.0,
    "quantity": 20,
    "weight_each": 1000.0,
    "orientation": "auto",
    "double_stack": false
}))]
pub struct PalletType {
    pub id: PalletTypeId,
    #[serde(default)]
    pub label: String,
    pub footprint_width: f64,
    pub footprint_length: f64,
    pub quantity: u32,
    #[serde(default)]
    pub weight_each: f64,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub double_stack: bool,
    #[serde(default)]
    pub linked_order_keys: Vec<OrderKey>,
    #[serde(default)]
    pub color_tag: u8,
}

impl PalletType {
    /// Creates a pallet type with quantity 0 and no weight.
    pub fn new(
        id: impl Into<PalletTypeId>,
        label: impl Into<String>,
        footprint_width: f64,
        footprint_length: f64,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            footprint_width,
            footprint_length,
            quantity: 0,
            weight_each: 0.0,
            orientation: Orientation::Auto,
            double_stack: false,
            linked_order_keys: Vec::new(),
            color_tag: 0,
        }
    }

    /// The pallet type added as the `index`-th row of a load sheet.
    pub fn default_at(index: usize, id: PalletTypeId) -> Self {
        Self::new(id, default_label(index), DEFAULT_PALLET_WIDTH, DEFAULT_PALLET_LENGTH)
            .with_quantity(1)
            .with_weight_each(DEFAULT_PALLET_WEIGHT)
            .with_color_tag(color_tag_for(index))
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_weight_each(mut self, weight_each: f64) -> Self {
        self.weight_each = weight_each;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_double_stack(mut self, double_stack: bool) -> Self {
        self.double_stack = double_stack;
        self
    }

    pub fn with_color_tag(mut self, color_tag: u8) -> Self {
        self.color_tag = color_tag;
        self
    }

    pub fn with_linked_order(mut self, key: OrderKey) -> Self {
        self.linked_order_keys.push(key);
        self
    }

    /// Physical sides before any axis has been assigned (width, length).
    pub fn physical_footprint(&self) -> Footprint {
        Footprint::new(self.footprint_width, self.footprint_length)
    }

    /// Checks whether the type contributes any floor units.
    pub fn is_packable(&self) -> bool {
        self.quantity > 0 && self.physical_footprint().is_valid()
    }

    /// Number of floor footprints needed: half the pallets (rounded up) when double stacked.
    pub fn floor_units(&self) -> usize {
        if !self.is_packable() {
            return 0;
        }
        let quantity = self.quantity as usize;
        if self.double_stack {
            quantity.div_ceil(2)
        } else {
            quantity
        }
    }

    /// Weight of all physical pallets of this type.
    pub fn total_weight(&self) -> f64 {
        f64::from(self.quantity) * self.weight_each
    }

    pub fn is_linked_to(&self, key: &OrderKey) -> bool {
        self.linked_order_keys.contains(key)
    }

    /// Rejects NaN and infinite numbers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_finite(self.footprint_width, "Footprint width")?;
        validate_finite(self.footprint_length, "Footprint length")?;
        validate_weight_value(self.weight_each, "Weight each")?;
        Ok(())
    }
}

/// Label of the `index`-th pallet row when nothing else names it.
pub fn default_label(index: usize) -> String {
    format!("Pallet {}", index + 1)
}

/// Display color assigned to the `index`-th pallet row.
pub fn color_tag_for(index: usize) -> u8 {
    (index % COLOR_TAG_COUNT as usize) as u8
}

/// A floor unit with its position in the trailer.
///
/// # Fields
/// * `across_pos` - Offset from the left side wall
/// * `along_pos` - Offset from the front wall
/// * `across` / `along` - Resolved footprint extents
/// * `source_type_id` - Pallet type the unit was expanded from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlacedUnit {
    pub across_pos: f64,
    pub along_pos: f64,
    pub across: f64,
    pub along: f64,
    pub source_type_id: PalletTypeId,
    pub color_tag: u8,
    pub label: String,
}

impl PlacedUnit {
    /// Far edge along the trailer (towards the door).
    pub fn along_end(&self) -> f64 {
        self.along_pos + self.along
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_position_and_footprint(self.position(), self.footprint())
    }
}

impl Dimensional for PlacedUnit {
    fn footprint(&self) -> Footprint {
        Footprint::new(self.across, self.along)
    }
}

impl Positioned for PlacedUnit {
    fn position(&self) -> Point {
        Point::new(self.across_pos, self.along_pos)
    }
}
