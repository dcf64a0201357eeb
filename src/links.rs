//! Order links and registry maintenance.
//!
//! A load sheet is an ordered list of pallet types. Dispatchers attach order
//! lines to pallet types for traceability; an order key may belong to at most
//! one pallet type at a time. Toggling a link is expressed as a pure
//! transition: the registry is never edited in place.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::model::{
    DEFAULT_PALLET_LENGTH, DEFAULT_PALLET_WIDTH, OrderKey, PalletType, PalletTypeId,
    ValidationError, color_tag_for, default_label,
};

/// Maximum number of characters of a customer name used as pallet label.
pub const CUSTOMER_LABEL_CHARS: usize = 20;

/// An order line offered for linking.
///
/// # Fields
/// * `order_key` - Key of the order line
/// * `customer_label` - Customer name, may be empty
/// * `package_count_hint` - Packages on the order; becomes the pallet quantity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "order_key": "IF-1042||PN-77",
    "customer_label": "Acme Fabrication",
    "package_count_hint": 6.0
}))]
pub struct OrderRef {
    pub order_key: OrderKey,
    #[serde(default)]
    pub customer_label: String,
    #[serde(default)]
    pub package_count_hint: f64,
}

impl OrderRef {
    pub fn new(
        order_key: OrderKey,
        customer_label: impl Into<String>,
        package_count_hint: f64,
    ) -> Self {
        Self {
            order_key,
            customer_label: customer_label.into(),
            package_count_hint,
        }
    }

    /// Pallet quantity suggested by the order: packages rounded up, at least one.
    pub fn pallet_count(&self) -> u32 {
        let hint = self.package_count_hint;
        if hint > 0.0 && hint.is_finite() {
            hint.ceil() as u32
        } else {
            1
        }
    }

    /// Customer name cut to label length, `None` when there is no name.
    pub fn label(&self) -> Option<String> {
        if self.customer_label.is_empty() {
            None
        } else {
            Some(self.customer_label.chars().take(CUSTOMER_LABEL_CHARS).collect())
        }
    }
}

/// Why a link toggle was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LinkRejection {
    /// The target pallet type is not in the registry.
    UnknownPalletType,
    /// The order is already linked to another pallet type.
    LinkedElsewhere { owner: PalletTypeId },
}

/// What toggling an order key on a pallet type will do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkDecision {
    /// Link the key to a pallet type that has no links yet.
    Attach { index: usize },
    /// The target already carries an order: add a new pallet type for this one.
    SpawnType { source_index: usize },
    /// Remove the key; `vacates` when it was the last one.
    Detach { index: usize, vacates: bool },
    Reject(LinkRejection),
}

/// Outcome of an applied link toggle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LinkOutcome {
    Attached { type_id: PalletTypeId },
    Spawned { type_id: PalletTypeId },
    Detached { type_id: PalletTypeId, vacated: bool },
    Rejected { rejection: LinkRejection },
}

impl LinkOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, LinkOutcome::Rejected { .. })
    }
}

/// Ordered list of pallet types; the position of an entry is its registry order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PalletRegistry {
    types: Vec<PalletType>,
}

impl PalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing pallet types without validation.
    pub fn from_types(types: Vec<PalletType>) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &[PalletType] {
        &self.types
    }

    pub fn into_types(self) -> Vec<PalletType> {
        self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn position(&self, id: &PalletTypeId) -> Option<usize> {
        self.types.iter().position(|t| &t.id == id)
    }

    pub fn get(&self, id: &PalletTypeId) -> Option<&PalletType> {
        self.types.iter().find(|t| &t.id == id)
    }

    /// Registry index of the pallet type an order key is linked to.
    pub fn owner_of(&self, key: &OrderKey) -> Option<usize> {
        self.types.iter().position(|t| t.is_linked_to(key))
    }

    /// Checks that ids are unique and no order key is linked twice.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut ids = HashSet::new();
        for pallet in &self.types {
            pallet.validate()?;
            if !ids.insert(&pallet.id) {
                return Err(ValidationError::DuplicateId(pallet.id.to_string()));
            }
        }

        for (index, pallet) in self.types.iter().enumerate() {
            for key in &pallet.linked_order_keys {
                let first = self.owner_of(key).unwrap_or(index);
                let repeated = pallet.linked_order_keys.iter().filter(|k| *k == key).count() > 1;
                if first != index || repeated {
                    return Err(ValidationError::DuplicateLink {
                        key: key.to_string(),
                        first: self.types[first].id.to_string(),
                        second: pallet.id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Next free id of the form `pt-{n}`, starting at `len + 1`.
    pub fn allocate_id(&self) -> PalletTypeId {
        let mut n = self.types.len() + 1;
        loop {
            let candidate = PalletTypeId::new(format!("pt-{}", n));
            if self.position(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Appends a default pallet type and returns its id.
    pub fn add_type(&mut self) -> PalletTypeId {
        let id = self.allocate_id();
        self.types.push(PalletType::default_at(self.types.len(), id.clone()));
        id
    }

    pub fn remove_type(&mut self, id: &PalletTypeId) -> Option<PalletType> {
        let index = self.position(id)?;
        Some(self.types.remove(index))
    }

    /// Moves a pallet type to another registry position, shifting the others.
    ///
    /// Returns `false` if either index is out of range.
    pub fn move_type(&mut self, from: usize, to: usize) -> bool {
        if from >= self.types.len() || to >= self.types.len() {
            return false;
        }
        let moved = self.types.remove(from);
        self.types.insert(to, moved);
        true
    }

    /// Applies an edit to one pallet type. Returns `false` if the id is unknown.
    pub fn update_type(&mut self, id: &PalletTypeId, edit: impl FnOnce(&mut PalletType)) -> bool {
        match self.types.iter_mut().find(|t| &t.id == id) {
            Some(pallet) => {
                edit(pallet);
                true
            }
            None => false,
        }
    }

    /// Decides what toggling `key` on the pallet type `type_id` does.
    pub fn decide_link_toggle(&self, type_id: &PalletTypeId, key: &OrderKey) -> LinkDecision {
        let Some(index) = self.position(type_id) else {
            return LinkDecision::Reject(LinkRejection::UnknownPalletType);
        };
        let target = &self.types[index];

        if target.is_linked_to(key) {
            return LinkDecision::Detach {
                index,
                vacates: target.linked_order_keys.len() == 1,
            };
        }
        if let Some(owner) = self.owner_of(key) {
            return LinkDecision::Reject(LinkRejection::LinkedElsewhere {
                owner: self.types[owner].id.clone(),
            });
        }
        if target.linked_order_keys.is_empty() {
            LinkDecision::Attach { index }
        } else {
            LinkDecision::SpawnType {
                source_index: index,
            }
        }
    }
}

/// Toggles an order link and returns the resulting registry.
///
/// The input registry is left untouched; a rejected toggle returns an
/// unchanged copy.
pub fn apply_link_toggle(
    registry: &PalletRegistry,
    type_id: &PalletTypeId,
    order: &OrderRef,
) -> (PalletRegistry, LinkOutcome) {
    let decision = registry.decide_link_toggle(type_id, &order.order_key);
    let mut next = registry.clone();

    let outcome = match decision {
        LinkDecision::Reject(rejection) => LinkOutcome::Rejected { rejection },
        LinkDecision::Attach { index } => {
            let pallet = &mut next.types[index];
            pallet.linked_order_keys = vec![order.order_key.clone()];
            pallet.quantity = order.pallet_count();
            if let Some(label) = order.label() {
                pallet.label = label;
            }
            LinkOutcome::Attached {
                type_id: pallet.id.clone(),
            }
        }
        LinkDecision::SpawnType { .. } => {
            let position = next.types.len();
            let id = next.allocate_id();
            let spawned = PalletType::new(
                id.clone(),
                order.label().unwrap_or_else(|| default_label(position)),
                DEFAULT_PALLET_WIDTH,
                DEFAULT_PALLET_LENGTH,
            )
            .with_quantity(order.pallet_count())
            .with_color_tag(color_tag_for(position))
            .with_linked_order(order.order_key.clone());
            next.types.push(spawned);
            LinkOutcome::Spawned { type_id: id }
        }
        LinkDecision::Detach { index, vacates } => {
            let pallet = &mut next.types[index];
            pallet.linked_order_keys.retain(|k| k != &order.order_key);
            if vacates {
                pallet.quantity = 0;
                pallet.weight_each = 0.0;
                pallet.label = default_label(index);
            }
            LinkOutcome::Detached {
                type_id: pallet.id.clone(),
                vacated: vacates,
            }
        }
    };

    (next, outcome)
}
