// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Prices-by-customer screen model: filter options, column visibility and
//! the parameter bag handed to the price query engine.

use thiserror::Error;
use tracing::debug;

use crate::{
    CostMode, CustomerId, ItemId, ParameterList, PersistenceError, PriceQuery, PriceRow,
};

pub const CUSTOMER_KEY: &str = "cust_id";
pub const ITEM_KEY: &str = "item_id";
pub const COST_NA_KEY: &str = "costna";

/// Display labels the query engine uses for computed text, in bag order.
pub const PRICE_LABELS: [(&str, &str); 7] = [
    ("na", "N/A"),
    (COST_NA_KEY, "?????"),
    ("customer", "Customer"),
    ("custType", "Cust. Type"),
    ("custTypePattern", "Cust. Type Pattern"),
    ("sale", "Sale"),
    ("listPrice", "List Price"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("You must specify a Customer.")]
    CustomerRequired,
    #[error("error running prices by customer: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceColumn {
    Schedule,
    Source,
    ItemNumber,
    Description,
    PriceUom,
    QtyBreak,
    Price,
    Currency,
    ExtCost,
    Margin,
}

impl PriceColumn {
    pub const ALL: [Self; 10] = [
        Self::Schedule,
        Self::Source,
        Self::ItemNumber,
        Self::Description,
        Self::PriceUom,
        Self::QtyBreak,
        Self::Price,
        Self::Currency,
        Self::ExtCost,
        Self::Margin,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Schedule => "Schedule",
            Self::Source => "Source",
            Self::ItemNumber => "Item Number",
            Self::Description => "Description",
            Self::PriceUom => "Price UOM",
            Self::QtyBreak => "Qty. Break",
            Self::Price => "Price",
            Self::Currency => "Currency",
            Self::ExtCost => "Ext. Cost",
            Self::Margin => "Mar. %",
        }
    }

    /// Columns whose visibility follows the "show costs" option.
    pub const fn is_cost_column(self) -> bool {
        matches!(self, Self::ExtCost | Self::Margin)
    }

    pub fn cell(self, row: &PriceRow) -> String {
        match self {
            Self::Schedule => row.schedule_name.clone(),
            Self::Source => row.source_label.clone(),
            Self::ItemNumber => row.item_number.clone(),
            Self::Description => row.item_description.clone(),
            Self::PriceUom => row.price_uom.clone(),
            Self::QtyBreak => format!("{:.2}", row.qty_break),
            Self::Price => format!("{:.4}", row.price),
            Self::Currency => row.currency.clone(),
            Self::ExtCost => row
                .cost
                .map_or_else(|| cost_na_label().to_owned(), |cost| format!("{cost:.4}")),
            Self::Margin => row
                .margin
                .map_or_else(|| cost_na_label().to_owned(), |margin| {
                    format!("{:.2}%", margin * 100.0)
                }),
        }
    }
}

fn cost_na_label() -> &'static str {
    PRICE_LABELS
        .iter()
        .find(|(key, _)| *key == COST_NA_KEY)
        .map_or("?", |(_, label)| *label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnState {
    pub column: PriceColumn,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricesByCustomer {
    customer: Option<CustomerId>,
    item: Option<ItemId>,
    show_costs: bool,
    cost_mode: CostMode,
    show_expired: bool,
    show_future: bool,
    costs_group_enabled: bool,
    columns: Vec<ColumnState>,
    rows: Vec<PriceRow>,
}

impl PricesByCustomer {
    pub fn new(single_currency: bool) -> Self {
        let columns = PriceColumn::ALL
            .iter()
            .map(|column| ColumnState {
                column: *column,
                visible: *column != PriceColumn::Currency || !single_currency,
            })
            .collect();
        let mut screen = Self {
            customer: None,
            item: None,
            show_costs: false,
            cost_mode: CostMode::None,
            show_expired: false,
            show_future: false,
            costs_group_enabled: false,
            columns,
            rows: Vec::new(),
        };
        screen.set_show_costs(false);
        screen
    }

    /// Applies `cust_id` / `item_id` pre-selection from the opening screen.
    pub fn configure(&mut self, options: &ParameterList) {
        if let Some(customer) = options.int(CUSTOMER_KEY) {
            self.set_customer(Some(CustomerId::new(customer)));
        }
        if let Some(item) = options.int(ITEM_KEY) {
            self.set_item(Some(ItemId::new(item)));
        }
    }

    /// Stale rows are never shown against an unset customer.
    pub fn set_customer(&mut self, customer: Option<CustomerId>) {
        self.customer = customer.filter(|id| id.is_valid());
        if self.customer.is_none() && !self.rows.is_empty() {
            debug!("customer cleared; dropping displayed prices");
            self.rows.clear();
        }
    }

    pub fn set_item(&mut self, item: Option<ItemId>) {
        self.item = item.filter(|id| id.is_valid());
    }

    pub fn set_show_costs(&mut self, show: bool) {
        self.show_costs = show;
        for state in &mut self.columns {
            if state.column.is_cost_column() {
                state.visible = show;
            }
        }
        self.costs_group_enabled = show;
    }

    pub fn set_cost_mode(&mut self, mode: CostMode) {
        self.cost_mode = mode;
    }

    pub fn set_show_expired(&mut self, show: bool) {
        self.show_expired = show;
    }

    pub fn set_show_future(&mut self, show: bool) {
        self.show_future = show;
    }

    pub fn build_parameters(&self) -> Result<ParameterList, ReportError> {
        let Some(customer) = self.customer else {
            return Err(ReportError::CustomerRequired);
        };

        let mut params = ParameterList::new();
        for (key, label) in PRICE_LABELS {
            params.append(key, label);
        }
        params.append(CUSTOMER_KEY, customer.get());
        if let Some(item) = self.item {
            params.append(ITEM_KEY, item.get());
        }
        params.append_flag("byCustomer");

        if self.show_costs {
            params.append_flag("showCosts");
            match self.cost_mode {
                CostMode::Standard => {
                    params.append_flag("useStandardCosts");
                    params.append_flag("standardCosts");
                }
                CostMode::Actual => {
                    params.append_flag("useActualCosts");
                    params.append_flag("actualCosts");
                }
                CostMode::None => {}
            }
        }

        if self.show_expired {
            params.append_flag("showExpired");
        }
        if self.show_future {
            params.append_flag("showFuture");
        }
        Ok(params)
    }

    pub fn run<Q: PriceQuery + ?Sized>(&mut self, engine: &Q) -> Result<usize, ReportError> {
        let params = self.build_parameters()?;
        let rows = engine.query_prices(&params)?;
        self.apply_rows(rows);
        Ok(self.rows.len())
    }

    pub fn apply_rows(&mut self, rows: Vec<PriceRow>) {
        self.rows = rows;
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnState] {
        &self.columns
    }

    pub fn visible_columns(&self) -> Vec<PriceColumn> {
        self.columns
            .iter()
            .filter(|state| state.visible)
            .map(|state| state.column)
            .collect()
    }

    pub fn is_column_visible(&self, column: PriceColumn) -> bool {
        self.columns
            .iter()
            .any(|state| state.column == column && state.visible)
    }

    pub fn customer(&self) -> Option<CustomerId> {
        self.customer
    }

    pub fn item(&self) -> Option<ItemId> {
        self.item
    }

    pub fn show_costs(&self) -> bool {
        self.show_costs
    }

    pub fn cost_mode(&self) -> CostMode {
        self.cost_mode
    }

    pub fn show_expired(&self) -> bool {
        self.show_expired
    }

    pub fn show_future(&self) -> bool {
        self.show_future
    }

    pub fn costs_group_enabled(&self) -> bool {
        self.costs_group_enabled
    }
}
