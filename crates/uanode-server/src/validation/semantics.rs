// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Properties whose change alters how a variable's value is interpreted.
//!
//! Writing a new value to one of these properties flags every data change
//! item on the owning variable as semantics-changed.

use uanode_core::ids::browse_names;
use uanode_core::{QualifiedName, Variant};

/// Browse names of the semantic properties.
pub const SEMANTIC_PROPERTY_NAMES: [&str; 11] = [
    browse_names::EU_RANGE,
    browse_names::INSTRUMENT_RANGE,
    browse_names::ENGINEERING_UNITS,
    browse_names::TITLE,
    browse_names::AXIS_DEFINITION,
    browse_names::X_AXIS_DEFINITION,
    browse_names::Y_AXIS_DEFINITION,
    browse_names::Z_AXIS_DEFINITION,
    browse_names::FALSE_STATE,
    browse_names::TRUE_STATE,
    browse_names::ENUM_STRINGS,
];

/// Returns `true` if a property named `browse_name` is semantic.
///
/// Only standard namespace names count.
pub fn is_semantic_property(browse_name: &QualifiedName) -> bool {
    browse_name.namespace_index == 0 && SEMANTIC_PROPERTY_NAMES.contains(&browse_name.name.as_str())
}

/// Returns `true` if writing `new` over `old` changes the semantics.
pub fn semantics_changed(old: &Variant, new: &Variant) -> bool {
    old != new
}

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::Range;

    #[test]
    fn test_semantic_names() {
        assert!(is_semantic_property(&QualifiedName::new(0, "EURange")));
        assert!(is_semantic_property(&QualifiedName::new(0, "EnumStrings")));
        assert!(!is_semantic_property(&QualifiedName::new(0, "ValuePrecision")));
        assert!(!is_semantic_property(&QualifiedName::new(2, "EURange")));
    }

    #[test]
    fn test_semantics_changed_compares_values() {
        let a = Variant::Range(Range::new(0.0, 100.0));
        let b = Variant::Range(Range::new(0.0, 200.0));
        assert!(semantics_changed(&a, &b));
        assert!(!semantics_changed(&a, &a.clone()));
    }
}
