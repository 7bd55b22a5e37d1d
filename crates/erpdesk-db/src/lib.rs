// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use erpdesk_app::{
    AppliesTo, Customer, CustomerId, CustomerTypeId, Item, ItemId, PRICE_LABELS, ParameterList,
    PersistenceError, PersistenceResult, PriceQuery, PriceRow, PriceScheduleId, PriceSource, Role,
    RoleId, RoleStore,
};
use rusqlite::{Connection, OptionalExtension, named_params, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

pub const APP_NAME: &str = "erpdesk";
pub const ROLE_SEQUENCE: &str = "crmrole_crmrole_id_seq";
pub const BASE_CURRENCY: &str = "USD";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("sequences", &["name", "value"]),
    (
        "crmrole",
        &[
            "crmrole_id",
            "crmrole_name",
            "crmrole_cntct",
            "crmrole_addr",
            "crmrole_email",
            "crmrole_phone",
            "crmrole_sort",
        ],
    ),
    ("custtype", &["custtype_id", "custtype_code"]),
    (
        "custinfo",
        &["cust_id", "cust_number", "cust_name", "cust_custtype_id"],
    ),
    (
        "item",
        &[
            "item_id",
            "item_number",
            "item_descrip",
            "item_price_uom",
            "item_listprice",
            "item_stdcost",
            "item_actcost",
        ],
    ),
    (
        "ipshead",
        &[
            "ipshead_id",
            "ipshead_name",
            "ipshead_effective",
            "ipshead_expires",
            "ipshead_curr",
        ],
    ),
    (
        "ipsitem",
        &[
            "ipsitem_id",
            "ipsitem_ipshead_id",
            "ipsitem_item_id",
            "ipsitem_qtybreak",
            "ipsitem_price",
        ],
    ),
    (
        "ipsass",
        &[
            "ipsass_id",
            "ipsass_ipshead_id",
            "ipsass_cust_id",
            "ipsass_custtype_id",
            "ipsass_custtype_pattern",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_crmrole_name",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_crmrole_name ON crmrole (crmrole_name);",
    },
    RequiredIndex {
        name: "idx_custtype_code",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_custtype_code ON custtype (custtype_code);",
    },
    RequiredIndex {
        name: "idx_custinfo_number",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_custinfo_number ON custinfo (cust_number);",
    },
    RequiredIndex {
        name: "idx_item_number",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_item_number ON item (item_number);",
    },
    RequiredIndex {
        name: "idx_ipsitem_ipshead_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_ipsitem_ipshead_id ON ipsitem (ipsitem_ipshead_id);",
    },
    RequiredIndex {
        name: "idx_ipsitem_item_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_ipsitem_item_id ON ipsitem (ipsitem_item_id);",
    },
    RequiredIndex {
        name: "idx_ipsass_ipshead_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_ipsass_ipshead_id ON ipsass (ipsass_ipshead_id);",
    },
];

/// A statement the role dialog can issue, labelled for error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoleStatement {
    label: &'static str,
    sql: &'static str,
}

const ROLE_NEXTVAL: RoleStatement = RoleStatement {
    label: "SELECT NEXTVAL('crmrole_crmrole_id_seq')",
    sql: "UPDATE sequences SET value = value + 1 WHERE name = ? RETURNING value",
};

const ROLE_SELECT: RoleStatement = RoleStatement {
    label: "SELECT * FROM crmrole WHERE (crmrole_id=:crmrole_id)",
    sql: "
        SELECT
          crmrole_id, crmrole_name, crmrole_cntct, crmrole_addr,
          crmrole_email, crmrole_phone, crmrole_sort
        FROM crmrole
        WHERE crmrole_id = :crmrole_id
        ",
};

const ROLE_INSERT: RoleStatement = RoleStatement {
    label: "INSERT INTO crmrole",
    sql: "
        INSERT INTO crmrole (
          crmrole_id, crmrole_name, crmrole_cntct, crmrole_addr,
          crmrole_email, crmrole_phone, crmrole_sort
        ) VALUES (
          :crmrole_id, :crmrole_name, :crmrole_cntct, :crmrole_addr,
          :crmrole_email, :crmrole_phone, :crmrole_sort
        )
        ",
};

const ROLE_UPDATE: RoleStatement = RoleStatement {
    label: "UPDATE crmrole WHERE (crmrole_id=:crmrole_id)",
    sql: "
        UPDATE crmrole
        SET
          crmrole_name = :crmrole_name,
          crmrole_cntct = :crmrole_cntct,
          crmrole_addr = :crmrole_addr,
          crmrole_email = :crmrole_email,
          crmrole_phone = :crmrole_phone,
          crmrole_sort = :crmrole_sort
        WHERE crmrole_id = :crmrole_id
        ",
};

const ROLE_DELETE: RoleStatement = RoleStatement {
    label: "DELETE FROM crmrole WHERE (crmrole_id=:crmrole_id)",
    sql: "DELETE FROM crmrole WHERE crmrole_id = :crmrole_id",
};

const PRICES_BY_CUSTOMER_LABEL: &str = "prices by customer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomerType {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub number: String,
    pub name: String,
    pub customer_type_id: CustomerTypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub number: String,
    pub description: String,
    pub price_uom: String,
    pub list_price: f64,
    pub standard_cost: f64,
    pub actual_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPriceSchedule {
    pub name: String,
    pub effective: Date,
    pub expires: Date,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewScheduleLine {
    pub item_id: ItemId,
    pub qty_break: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceAssignment {
    Customer(CustomerId),
    CustomerType(CustomerTypeId),
    /// SQLite GLOB pattern matched against the customer type code.
    CustomerTypePattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerTypeLookup {
    pub id: CustomerTypeId,
    pub code: String,
}

pub struct Store {
    conn: Connection,
    price_date: Option<Date>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            price_date: None,
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            price_date: None,
        })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        self.seed_sequences()?;
        Ok(())
    }

    fn seed_sequences(&self) -> Result<()> {
        self.conn
            .execute(
                "
                INSERT OR IGNORE INTO sequences (name, value)
                SELECT ?, COALESCE(MAX(crmrole_id), 0) FROM crmrole
                ",
                params![ROLE_SEQUENCE],
            )
            .with_context(|| format!("seed sequence {ROLE_SEQUENCE}"))?;
        Ok(())
    }

    /// Pins the date used to decide which price schedules are expired or future.
    pub fn set_price_date(&mut self, date: Date) {
        self.price_date = Some(date);
    }

    pub fn price_date(&self) -> Date {
        self.price_date
            .unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }

    pub fn next_sequence_value(&self, name: &str) -> Result<i64> {
        self.conn
            .query_row(ROLE_NEXTVAL.sql, params![name], |row| row.get(0))
            .optional()
            .with_context(|| format!("advance sequence {name}"))?
            .ok_or_else(|| anyhow!("sequence {name} does not exist -- run bootstrap first"))
    }

    pub fn next_role_id(&self) -> Result<RoleId> {
        self.next_sequence_value(ROLE_SEQUENCE).map(RoleId::new)
    }

    pub fn get_role(&self, role_id: RoleId) -> Result<Option<Role>> {
        self.conn
            .query_row(
                ROLE_SELECT.sql,
                named_params! { ":crmrole_id": role_id.get() },
                role_from_row,
            )
            .optional()
            .with_context(|| format!("load crm role {role_id}"))
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  crmrole_id, crmrole_name, crmrole_cntct, crmrole_addr,
                  crmrole_email, crmrole_phone, crmrole_sort
                FROM crmrole
                ORDER BY crmrole_sort ASC, crmrole_name ASC, crmrole_id ASC
                ",
            )
            .context("prepare crm roles query")?;
        let rows = stmt
            .query_map([], role_from_row)
            .context("query crm roles")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect crm roles")
    }

    pub fn create_role(&self, role: &Role) -> Result<()> {
        self.conn
            .execute(
                ROLE_INSERT.sql,
                named_params! {
                    ":crmrole_id": role.id.get(),
                    ":crmrole_name": role.name,
                    ":crmrole_cntct": role.applies_to.contact,
                    ":crmrole_addr": role.applies_to.address,
                    ":crmrole_email": role.applies_to.email,
                    ":crmrole_phone": role.applies_to.phone,
                    ":crmrole_sort": role.sort_order,
                },
            )
            .with_context(|| format!("insert crm role {}", role.id))?;
        info!(role_id = %role.id, "inserted crm role");
        Ok(())
    }

    /// Last write wins: there is no check that the row is unchanged since it was loaded.
    pub fn update_role(&self, role: &Role) -> Result<usize> {
        let rows_affected = self
            .conn
            .execute(
                ROLE_UPDATE.sql,
                named_params! {
                    ":crmrole_id": role.id.get(),
                    ":crmrole_name": role.name,
                    ":crmrole_cntct": role.applies_to.contact,
                    ":crmrole_addr": role.applies_to.address,
                    ":crmrole_email": role.applies_to.email,
                    ":crmrole_phone": role.applies_to.phone,
                    ":crmrole_sort": role.sort_order,
                },
            )
            .with_context(|| format!("update crm role {}", role.id))?;
        info!(role_id = %role.id, rows_affected, "updated crm role");
        Ok(rows_affected)
    }

    pub fn delete_role(&self, role_id: RoleId) -> Result<usize> {
        let rows_affected = self
            .conn
            .execute(
                ROLE_DELETE.sql,
                named_params! { ":crmrole_id": role_id.get() },
            )
            .with_context(|| format!("delete crm role {role_id}"))?;
        debug!(role_id = %role_id, rows_affected, "deleted crm role");
        Ok(rows_affected)
    }

    pub fn create_customer_type(&self, customer_type: &NewCustomerType) -> Result<CustomerTypeId> {
        self.conn
            .execute(
                "INSERT INTO custtype (custtype_code) VALUES (?)",
                params![customer_type.code],
            )
            .with_context(|| format!("insert customer type {}", customer_type.code))?;
        Ok(CustomerTypeId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_customer_types(&self) -> Result<Vec<CustomerTypeLookup>> {
        let mut stmt = self
            .conn
            .prepare("SELECT custtype_id, custtype_code FROM custtype ORDER BY custtype_code ASC")
            .context("prepare customer types query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CustomerTypeLookup {
                    id: CustomerTypeId::new(row.get(0)?),
                    code: row.get(1)?,
                })
            })
            .context("query customer types")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect customer types")
    }

    pub fn create_customer(&self, customer: &NewCustomer) -> Result<CustomerId> {
        self.conn
            .execute(
                "
                INSERT INTO custinfo (cust_number, cust_name, cust_custtype_id)
                VALUES (?, ?, ?)
                ",
                params![
                    customer.number,
                    customer.name,
                    customer.customer_type_id.get()
                ],
            )
            .with_context(|| format!("insert customer {}", customer.number))?;
        Ok(CustomerId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_customers(&self) -> Result<Vec<Customer>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT cust_id, cust_number, cust_name, cust_custtype_id
                FROM custinfo
                ORDER BY cust_number ASC
                ",
            )
            .context("prepare customers query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Customer {
                    id: CustomerId::new(row.get(0)?),
                    number: row.get(1)?,
                    name: row.get(2)?,
                    customer_type_id: CustomerTypeId::new(row.get(3)?),
                })
            })
            .context("query customers")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect customers")
    }

    pub fn create_item(&self, item: &NewItem) -> Result<ItemId> {
        self.conn
            .execute(
                "
                INSERT INTO item (
                  item_number, item_descrip, item_price_uom,
                  item_listprice, item_stdcost, item_actcost
                ) VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    item.number,
                    item.description,
                    item.price_uom,
                    item.list_price,
                    item.standard_cost,
                    item.actual_cost,
                ],
            )
            .with_context(|| format!("insert item {}", item.number))?;
        Ok(ItemId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_items(&self) -> Result<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  item_id, item_number, item_descrip, item_price_uom,
                  item_listprice, item_stdcost, item_actcost
                FROM item
                ORDER BY item_number ASC
                ",
            )
            .context("prepare items query")?;
        let rows = stmt
            .query_map([], item_from_row)
            .context("query items")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect items")
    }

    pub fn get_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        self.conn
            .query_row(
                "
                SELECT
                  item_id, item_number, item_descrip, item_price_uom,
                  item_listprice, item_stdcost, item_actcost
                FROM item
                WHERE item_id = ?
                ",
                params![item_id.get()],
                item_from_row,
            )
            .optional()
            .with_context(|| format!("load item {item_id}"))
    }

    pub fn create_price_schedule(&self, schedule: &NewPriceSchedule) -> Result<PriceScheduleId> {
        if schedule.expires < schedule.effective {
            bail!(
                "price schedule {} expires before it takes effect -- fix the date range and retry",
                schedule.name
            );
        }
        self.conn
            .execute(
                "
                INSERT INTO ipshead (ipshead_name, ipshead_effective, ipshead_expires, ipshead_curr)
                VALUES (?, ?, ?, ?)
                ",
                params![
                    schedule.name,
                    format_date(schedule.effective),
                    format_date(schedule.expires),
                    schedule.currency,
                ],
            )
            .with_context(|| format!("insert price schedule {}", schedule.name))?;
        Ok(PriceScheduleId::new(self.conn.last_insert_rowid()))
    }

    pub fn add_schedule_line(
        &self,
        schedule_id: PriceScheduleId,
        line: &NewScheduleLine,
    ) -> Result<()> {
        self.conn
            .execute(
                "
                INSERT INTO ipsitem (ipsitem_ipshead_id, ipsitem_item_id, ipsitem_qtybreak, ipsitem_price)
                VALUES (?, ?, ?, ?)
                ",
                params![
                    schedule_id.get(),
                    line.item_id.get(),
                    line.qty_break,
                    line.price
                ],
            )
            .with_context(|| {
                format!(
                    "insert price schedule {schedule_id} line for item {}",
                    line.item_id
                )
            })?;
        Ok(())
    }

    pub fn assign_price_schedule(
        &self,
        schedule_id: PriceScheduleId,
        assignment: &PriceAssignment,
    ) -> Result<()> {
        let (customer, customer_type, pattern) = match assignment {
            PriceAssignment::Customer(id) => (Some(id.get()), None, None),
            PriceAssignment::CustomerType(id) => (None, Some(id.get()), None),
            PriceAssignment::CustomerTypePattern(pattern) => {
                if pattern.trim().is_empty() {
                    bail!("customer type pattern must not be empty");
                }
                (None, None, Some(pattern.as_str()))
            }
        };
        self.conn
            .execute(
                "
                INSERT INTO ipsass (
                  ipsass_ipshead_id, ipsass_cust_id, ipsass_custtype_id, ipsass_custtype_pattern
                ) VALUES (?, ?, ?, ?)
                ",
                params![schedule_id.get(), customer, customer_type, pattern],
            )
            .with_context(|| format!("assign price schedule {schedule_id}"))?;
        Ok(())
    }

    /// Runs the price listing for a bag built by the prices-by-customer screen.
    pub fn prices_by_customer(&self, params: &ParameterList, as_of: Date) -> Result<Vec<PriceRow>> {
        let customer_id = params
            .int("cust_id")
            .filter(|id| *id > 0)
            .ok_or_else(|| anyhow!("prices by customer requires cust_id -- choose a customer"))?;
        let item_id = params.int("item_id").filter(|id| *id > 0);
        let costing = Costing::from_params(params);
        let as_of_text = format_date(as_of);

        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  h.ipshead_id, h.ipshead_name, h.ipshead_effective, h.ipshead_expires,
                  h.ipshead_curr,
                  i.item_id, i.item_number, i.item_descrip, i.item_price_uom,
                  i.item_stdcost, i.item_actcost,
                  s.ipsitem_qtybreak, s.ipsitem_price,
                  CASE
                    WHEN a.ipsass_cust_id IS NOT NULL THEN 0
                    WHEN a.ipsass_custtype_id IS NOT NULL THEN 1
                    ELSE 2
                  END AS source
                FROM custinfo c
                JOIN custtype t ON t.custtype_id = c.cust_custtype_id
                JOIN ipsass a ON (
                  a.ipsass_cust_id = c.cust_id
                  OR a.ipsass_custtype_id = c.cust_custtype_id
                  OR (a.ipsass_custtype_pattern IS NOT NULL
                      AND t.custtype_code GLOB a.ipsass_custtype_pattern)
                )
                JOIN ipshead h ON h.ipshead_id = a.ipsass_ipshead_id
                JOIN ipsitem s ON s.ipsitem_ipshead_id = h.ipshead_id
                JOIN item i ON i.item_id = s.ipsitem_item_id
                WHERE c.cust_id = :cust_id
                  AND (:item_id IS NULL OR i.item_id = :item_id)
                  AND (:show_expired OR h.ipshead_expires >= :as_of)
                  AND (:show_future OR h.ipshead_effective <= :as_of)
                ORDER BY i.item_number ASC, source ASC, h.ipshead_name ASC, s.ipsitem_qtybreak ASC
                ",
            )
            .context("prepare prices by customer query")?;

        let raw_rows = stmt
            .query_map(
                named_params! {
                    ":cust_id": customer_id,
                    ":item_id": item_id,
                    ":show_expired": params.contains("showExpired"),
                    ":show_future": params.contains("showFuture"),
                    ":as_of": as_of_text,
                },
                |row| {
                    let source = match row.get::<_, i64>(13)? {
                        0 => PriceSource::Customer,
                        1 => PriceSource::CustomerType,
                        _ => PriceSource::CustomerTypePattern,
                    };
                    Ok(RawPriceRow {
                        schedule_id: PriceScheduleId::new(row.get(0)?),
                        schedule_name: row.get(1)?,
                        effective: row.get(2)?,
                        expires: row.get(3)?,
                        currency: row.get(4)?,
                        item_id: ItemId::new(row.get(5)?),
                        item_number: row.get(6)?,
                        item_description: row.get(7)?,
                        price_uom: row.get(8)?,
                        standard_cost: row.get(9)?,
                        actual_cost: row.get(10)?,
                        qty_break: row.get(11)?,
                        price: row.get(12)?,
                        source,
                    })
                },
            )
            .context("query prices by customer")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect prices by customer")?;

        let mut rows = Vec::with_capacity(raw_rows.len() + 1);
        for raw in raw_rows {
            let cost = costing.cost(raw.standard_cost, raw.actual_cost);
            rows.push(PriceRow {
                schedule_id: Some(raw.schedule_id),
                schedule_name: raw.schedule_name,
                source: raw.source,
                source_label: source_label(params, raw.source),
                item_id: raw.item_id,
                item_number: raw.item_number,
                item_description: raw.item_description,
                price_uom: raw.price_uom,
                qty_break: raw.qty_break,
                price: raw.price,
                currency: raw.currency,
                effective: Some(parse_date(&raw.effective)?),
                expires: Some(parse_date(&raw.expires)?),
                cost,
                margin: margin(raw.price, cost),
            });
        }

        if let Some(item_id) = item_id
            && let Some(item) = self.get_item(ItemId::new(item_id))?
        {
            let cost = costing.cost(item.standard_cost, item.actual_cost);
            rows.push(PriceRow {
                schedule_id: None,
                schedule_name: params.text("na").unwrap_or("N/A").to_owned(),
                source: PriceSource::ListPrice,
                source_label: source_label(params, PriceSource::ListPrice),
                item_id: item.id,
                item_number: item.number,
                item_description: item.description,
                price_uom: item.price_uom,
                qty_break: 0.0,
                price: item.list_price,
                currency: BASE_CURRENCY.to_owned(),
                effective: None,
                expires: None,
                cost,
                margin: margin(item.list_price, cost),
            });
        }

        debug!(customer_id, rows = rows.len(), "ran prices by customer");
        Ok(rows)
    }
}

impl RoleStore for Store {
    fn next_role_id(&self) -> PersistenceResult<RoleId> {
        Store::next_role_id(self).map_err(|error| persistence_error(ROLE_NEXTVAL, &error))
    }

    fn select_role(&self, role_id: RoleId) -> PersistenceResult<Option<Role>> {
        self.get_role(role_id)
            .map_err(|error| persistence_error(ROLE_SELECT, &error))
    }

    fn insert_role(&self, role: &Role) -> PersistenceResult<()> {
        self.create_role(role)
            .map_err(|error| persistence_error(ROLE_INSERT, &error))
    }

    fn update_role(&self, role: &Role) -> PersistenceResult<()> {
        Store::update_role(self, role)
            .map(|_| ())
            .map_err(|error| persistence_error(ROLE_UPDATE, &error))
    }

    fn delete_role(&self, role_id: RoleId) -> PersistenceResult<()> {
        Store::delete_role(self, role_id)
            .map(|_| ())
            .map_err(|error| persistence_error(ROLE_DELETE, &error))
    }
}

impl PriceQuery for Store {
    fn query_prices(&self, params: &ParameterList) -> PersistenceResult<Vec<PriceRow>> {
        self.prices_by_customer(params, self.price_date())
            .map_err(|error| PersistenceError::new(PRICES_BY_CUSTOMER_LABEL, format!("{error:#}")))
    }
}

struct RawPriceRow {
    schedule_id: PriceScheduleId,
    schedule_name: String,
    effective: String,
    expires: String,
    currency: String,
    item_id: ItemId,
    item_number: String,
    item_description: String,
    price_uom: String,
    standard_cost: f64,
    actual_cost: f64,
    qty_break: f64,
    price: f64,
    source: PriceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Costing {
    Hidden,
    Unknown,
    Standard,
    Actual,
}

impl Costing {
    fn from_params(params: &ParameterList) -> Self {
        if !params.contains("showCosts") {
            Self::Hidden
        } else if params.contains("useStandardCosts") {
            Self::Standard
        } else if params.contains("useActualCosts") {
            Self::Actual
        } else {
            Self::Unknown
        }
    }

    fn cost(self, standard: f64, actual: f64) -> Option<f64> {
        match self {
            Self::Hidden | Self::Unknown => None,
            Self::Standard => Some(standard),
            Self::Actual => Some(actual),
        }
    }
}

fn margin(price: f64, cost: Option<f64>) -> Option<f64> {
    let cost = cost?;
    if price > 0.0 {
        Some((price - cost) / price)
    } else {
        None
    }
}

fn source_label(params: &ParameterList, source: PriceSource) -> String {
    let key = source.label_key();
    params
        .text(key)
        .or_else(|| {
            PRICE_LABELS
                .iter()
                .find(|(label_key, _)| *label_key == key)
                .map(|(_, label)| *label)
        })
        .unwrap_or(key)
        .to_owned()
}

fn persistence_error(statement: RoleStatement, error: &anyhow::Error) -> PersistenceError {
    PersistenceError::new(statement.label, format!("{error:#}"))
}

fn role_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: RoleId::new(row.get(0)?),
        name: row.get(1)?,
        applies_to: AppliesTo {
            contact: row.get(2)?,
            address: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
        },
        sort_order: row.get(6)?,
    })
}

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: ItemId::new(row.get(0)?),
        number: row.get(1)?,
        description: row.get(2)?,
        price_uom: row.get(3)?,
        list_price: row.get(4)?,
        standard_cost: row.get(5)?,
        actual_cost: row.get(6)?,
    })
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("ERPDESK_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set ERPDESK_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("erpdesk.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use an erpdesk-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw, &format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("unsupported date format {raw:?}"))
}

fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}
