// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{AppliesTo, Role, RoleId};

pub const ROLE_NAME_REQUIRED: &str = "You must enter a Role before you may save it.";
pub const ROLE_ASSIGNMENT_REQUIRED: &str =
    "You must make at least one assignment before you may save the role.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleField {
    Name,
    Contact,
    Address,
    Email,
    Phone,
    SortOrder,
}

impl RoleField {
    pub const ALL: [Self; 6] = [
        Self::Name,
        Self::Contact,
        Self::Address,
        Self::Email,
        Self::Phone,
        Self::SortOrder,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Role",
            Self::Contact => "Contact",
            Self::Address => "Address",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::SortOrder => "Order",
        }
    }
}

/// One failed validation rule, anchored to the field that should take focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: RoleField,
    pub message: String,
}

impl Violation {
    pub fn new(field: RoleField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Editable field state of the role dialog, independent of any rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleForm {
    pub name: String,
    pub applies_to: AppliesTo,
    pub sort_order: i32,
}

impl RoleForm {
    pub fn from_role(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            applies_to: role.applies_to,
            sort_order: role.sort_order,
        }
    }

    pub fn to_role(&self, id: RoleId) -> Role {
        Role {
            id,
            name: self.name.clone(),
            applies_to: self.applies_to,
            sort_order: self.sort_order,
        }
    }

    pub fn flag(&self, field: RoleField) -> Option<bool> {
        match field {
            RoleField::Contact => Some(self.applies_to.contact),
            RoleField::Address => Some(self.applies_to.address),
            RoleField::Email => Some(self.applies_to.email),
            RoleField::Phone => Some(self.applies_to.phone),
            RoleField::Name | RoleField::SortOrder => None,
        }
    }

    /// Flips a checkbox field; returns false for non-checkbox fields.
    pub fn toggle(&mut self, field: RoleField) -> bool {
        let slot = match field {
            RoleField::Contact => &mut self.applies_to.contact,
            RoleField::Address => &mut self.applies_to.address,
            RoleField::Email => &mut self.applies_to.email,
            RoleField::Phone => &mut self.applies_to.phone,
            RoleField::Name | RoleField::SortOrder => return false,
        };
        *slot = !*slot;
        true
    }

    /// Every rule is evaluated so the user sees all problems at once.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(Violation::new(RoleField::Name, ROLE_NAME_REQUIRED));
        }
        if !self.applies_to.any() {
            // Focus lands on the address box, the first one in the group.
            violations.push(Violation::new(RoleField::Address, ROLE_ASSIGNMENT_REQUIRED));
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::{ROLE_ASSIGNMENT_REQUIRED, ROLE_NAME_REQUIRED, RoleField, RoleForm};
    use crate::AppliesTo;

    fn form(name: &str, applies_to: AppliesTo) -> RoleForm {
        RoleForm {
            name: name.to_owned(),
            applies_to,
            sort_order: 0,
        }
    }

    fn only_contact() -> AppliesTo {
        AppliesTo {
            contact: true,
            ..AppliesTo::default()
        }
    }

    #[test]
    fn blank_or_whitespace_name_is_rejected_regardless_of_flags() {
        for name in ["", " ", "\t\n  "] {
            for applies_to in [AppliesTo::default(), only_contact()] {
                let violations = form(name, applies_to).validate();
                assert!(
                    violations
                        .iter()
                        .any(|violation| violation.message == ROLE_NAME_REQUIRED),
                    "name {name:?} should be rejected"
                );
            }
        }
    }

    #[test]
    fn all_flags_clear_is_rejected_even_with_valid_name() {
        let violations = form("Sales Lead", AppliesTo::default()).validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, ROLE_ASSIGNMENT_REQUIRED);
        assert_eq!(violations[0].field, RoleField::Address);
    }

    #[test]
    fn both_rules_are_reported_together() {
        let violations = form("", AppliesTo::default()).validate();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].field, RoleField::Name);
        assert_eq!(violations[1].field, RoleField::Address);
    }

    #[test]
    fn any_single_flag_with_name_is_valid() {
        for field in [
            RoleField::Contact,
            RoleField::Address,
            RoleField::Email,
            RoleField::Phone,
        ] {
            let mut candidate = form("Billing", AppliesTo::default());
            assert!(candidate.toggle(field));
            assert!(candidate.validate().is_empty(), "{field:?} alone should pass");
        }
    }

    #[test]
    fn toggle_ignores_non_checkbox_fields() {
        let mut candidate = form("Billing", AppliesTo::default());
        assert!(!candidate.toggle(RoleField::Name));
        assert!(!candidate.toggle(RoleField::SortOrder));
        assert_eq!(candidate.flag(RoleField::Name), None);
        assert!(candidate.toggle(RoleField::Email));
        assert_eq!(candidate.flag(RoleField::Email), Some(true));
    }
}
