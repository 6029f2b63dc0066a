//! Equipment items and their spec values.

use pf_core::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rounded numeric spec with its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecValue {
    pub value: f64,
    pub unit: String,
}

/// How many units are installed for a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redundancy {
    /// Duty units carry the load; standby units are installed spares.
    DutyStandby { duty: u32, standby: u32 },
    /// Parallel units with no installed spare.
    Parallel(u32),
    /// Single-unit policy, documented in the item's notes.
    Single,
}

impl Redundancy {
    /// Duty units plus one standby.
    pub fn n_plus_one(duty: u32) -> Self {
        Redundancy::DutyStandby {
            duty: duty.max(1),
            standby: 1,
        }
    }

    pub fn quantity(self) -> u32 {
        match self {
            Redundancy::DutyStandby { duty, standby } => duty + standby,
            Redundancy::Parallel(n) => n.max(1),
            Redundancy::Single => 1,
        }
    }

    /// Units sharing the load.
    pub fn duty(self) -> u32 {
        match self {
            Redundancy::DutyStandby { duty, .. } => duty.max(1),
            Redundancy::Parallel(n) => n.max(1),
            Redundancy::Single => 1,
        }
    }
}

/// A discrete manufactured unit derived from a converged stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub id: String,
    pub process: String,
    pub equipment_type: String,
    pub description: String,
    pub quantity: u32,
    pub specs: BTreeMap<String, SpecValue>,
    pub design_basis: String,
    pub notes: Vec<String>,
    /// Set by downstream editing tools only.
    pub is_user_overridden: bool,
    /// Set by downstream editing tools only.
    pub is_user_locked: bool,
}

impl EquipmentItem {
    pub fn new(
        id: String,
        process: &str,
        equipment_type: &str,
        description: impl Into<String>,
        redundancy: Redundancy,
        design_basis: impl Into<String>,
    ) -> Self {
        let mut item = Self {
            id,
            process: process.to_string(),
            equipment_type: equipment_type.to_string(),
            description: description.into(),
            quantity: redundancy.quantity(),
            specs: BTreeMap::new(),
            design_basis: design_basis.into(),
            notes: Vec::new(),
            is_user_overridden: false,
            is_user_locked: false,
        };
        if let Redundancy::DutyStandby { duty, standby } = redundancy {
            item.notes.push(format!("{duty} duty + {standby} standby"));
        }
        item
    }

    /// Add a spec rounded to `decimals` places.
    pub fn spec(mut self, name: &str, value: f64, unit: &str, decimals: i32) -> Self {
        self.specs.insert(
            name.to_string(),
            SpecValue {
                value: round_to(value, decimals),
                unit: unit.to_string(),
            },
        );
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn spec_value(&self, name: &str) -> Option<f64> {
        self.specs.get(name).map(|s| s.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundancy_quantities() {
        assert_eq!(Redundancy::n_plus_one(0).quantity(), 2);
        assert_eq!(Redundancy::n_plus_one(3).quantity(), 4);
        assert_eq!(Redundancy::Parallel(0).quantity(), 1);
        assert_eq!(Redundancy::Single.quantity(), 1);
    }

    #[test]
    fn specs_are_rounded_and_flags_start_false() {
        let item = EquipmentItem::new(
            "PT-001".into(),
            "Preliminary Treatment",
            "Fine screen",
            "Mechanically cleaned fine screen",
            Redundancy::n_plus_one(1),
            "Peak flow",
        )
        .spec("capacity", 1234.5678, "m3/d", 1);
        assert_eq!(item.spec_value("capacity"), Some(1234.6));
        assert!(!item.is_user_overridden);
        assert!(!item.is_user_locked);
        assert_eq!(item.notes, vec!["1 duty + 1 standby".to_string()]);
    }
}
