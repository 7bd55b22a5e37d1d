// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogMode {
    New,
    Edit,
    View,
}

impl DialogMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Edit => "edit",
            Self::View => "view",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "edit" => Some(Self::Edit),
            "view" => Some(Self::View),
            _ => None,
        }
    }

    pub const fn is_editable(self) -> bool {
        match self {
            Self::New | Self::Edit => true,
            Self::View => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppliesTo {
    pub contact: bool,
    pub address: bool,
    pub email: bool,
    pub phone: bool,
}

impl AppliesTo {
    pub const fn any(self) -> bool {
        self.contact || self.address || self.email || self.phone
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub applies_to: AppliesTo,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CostMode {
    #[default]
    None,
    Standard,
    Actual,
}

impl CostMode {
    pub const ALL: [Self; 3] = [Self::None, Self::Standard, Self::Actual];

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::Actual => "actual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub number: String,
    pub name: String,
    pub customer_type_id: CustomerTypeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub number: String,
    pub description: String,
    pub price_uom: String,
    pub list_price: f64,
    pub standard_cost: f64,
    pub actual_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    Customer,
    CustomerType,
    CustomerTypePattern,
    Sale,
    ListPrice,
}

impl PriceSource {
    /// Parameter-bag key carrying the display label for this source.
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::CustomerType => "custType",
            Self::CustomerTypePattern => "custTypePattern",
            Self::Sale => "sale",
            Self::ListPrice => "listPrice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub schedule_id: Option<PriceScheduleId>,
    pub schedule_name: String,
    pub source: PriceSource,
    pub source_label: String,
    pub item_id: ItemId,
    pub item_number: String,
    pub item_description: String,
    pub price_uom: String,
    pub qty_break: f64,
    pub price: f64,
    pub currency: String,
    pub effective: Option<Date>,
    pub expires: Option<Date>,
    pub cost: Option<f64>,
    pub margin: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Roles,
    Prices,
}

impl TabKind {
    pub const ALL: [Self; 2] = [Self::Roles, Self::Prices];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Roles => "crm roles",
            Self::Prices => "prices by customer",
        }
    }
}
