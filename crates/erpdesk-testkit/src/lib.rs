// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use erpdesk_app::AppliesTo;
use std::path::PathBuf;
use time::{Date, Duration, Month};

const CUSTOMER_TYPES: [&str; 6] = ["NORMAL", "WHOLESALE", "WHSL-EAST", "WHSL-WEST", "RETAIL", "GOV"];

const COMPANY_PREFIXES: [&str; 12] = [
    "Prodiem",
    "Tremendous",
    "Northwind",
    "Bluebird",
    "Summit",
    "Harbor",
    "Keystone",
    "Lakeside",
    "Redwood",
    "Ironbridge",
    "Meadow",
    "Granite",
];
const COMPANY_SUFFIXES: [&str; 6] = ["Toys", "Supply", "Trading", "Outfitters", "Goods", "Depot"];

const ITEM_NOUNS: [&str; 14] = [
    "Truck",
    "Wagon",
    "Bicycle",
    "Kite",
    "Puzzle",
    "Yo-Yo",
    "Train Set",
    "Doll House",
    "Scooter",
    "Ball",
    "Crayon Box",
    "Drum",
    "Sailboat",
    "Robot",
];
const ITEM_ADJECTIVES: [&str; 8] = [
    "Classic", "Deluxe", "Mini", "Wooden", "Tin", "Junior", "Premium", "Pocket",
];
const PRICE_UOMS: [&str; 3] = ["EA", "CS", "PK"];

const ROLE_NAMES: [&str; 10] = [
    "Billing",
    "Shipping",
    "Purchasing",
    "Sales",
    "Support",
    "Accounts Payable",
    "Receiving",
    "Engineering",
    "Legal",
    "Marketing",
];

const SCHEDULE_KINDS: [&str; 5] = ["STANDARD", "VOLUME", "PROMO", "CONTRACT", "SEASONAL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerFixture {
    pub number: String,
    pub name: String,
    pub type_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFixture {
    pub number: String,
    pub description: String,
    pub price_uom: String,
    pub list_price: f64,
    pub standard_cost: f64,
    pub actual_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleFixture {
    pub name: String,
    pub effective: Date,
    pub expires: Date,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleLineFixture {
    pub qty_break: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFixture {
    pub name: String,
    pub applies_to: AppliesTo,
    pub sort_order: i32,
}

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for demo and test catalogs.
pub struct CatalogFaker {
    rng: DeterministicRng,
    customer_serial: u32,
    item_serial: u32,
    role_serial: usize,
}

impl CatalogFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            customer_serial: 0,
            item_serial: 0,
            role_serial: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn customer(&mut self, type_code: &str) -> CustomerFixture {
        self.customer_serial += 1;
        let name = format!(
            "{} {}",
            self.pick(&COMPANY_PREFIXES),
            self.pick(&COMPANY_SUFFIXES)
        );
        CustomerFixture {
            number: format!("C{:05}", self.customer_serial),
            name,
            type_code: type_code.to_owned(),
        }
    }

    pub fn item(&mut self) -> ItemFixture {
        self.item_serial += 1;
        let noun = self.pick(&ITEM_NOUNS);
        let adjective = self.pick(&ITEM_ADJECTIVES);
        let list_cents = self.int_range_i64(199, 24_999);
        let standard_cents = list_cents * self.int_range_i64(40, 75) / 100;
        let drift = self.int_range_i64(-8, 8);
        let actual_cents = (standard_cents + standard_cents * drift / 100).max(1);

        ItemFixture {
            number: format!("{}{:04}", item_code_prefix(noun), self.item_serial),
            description: format!("{adjective} {noun}"),
            price_uom: self.pick(&PRICE_UOMS).to_owned(),
            list_price: cents_to_amount(list_cents),
            standard_cost: cents_to_amount(standard_cents),
            actual_cost: cents_to_amount(actual_cents),
        }
    }

    /// A one-year schedule starting on `effective`.
    pub fn schedule(&mut self, effective: Date) -> ScheduleFixture {
        ScheduleFixture {
            name: format!(
                "{}-{}-{:02}",
                self.pick(&SCHEDULE_KINDS),
                effective.year(),
                self.int_n(100)
            ),
            effective,
            expires: effective + Duration::days(364),
            currency: "USD".to_owned(),
        }
    }

    /// Discounted price for an item at the given quantity break.
    pub fn schedule_line(&mut self, item: &ItemFixture, qty_break: f64) -> ScheduleLineFixture {
        let discount = self.int_range_i64(2, 25);
        let list_cents = (item.list_price * 100.0).round() as i64;
        ScheduleLineFixture {
            qty_break,
            price: cents_to_amount(list_cents - list_cents * discount / 100),
        }
    }

    /// Roles cycle through a fixed name list so a catalog never repeats a name.
    pub fn role(&mut self) -> RoleFixture {
        let base = ROLE_NAMES[self.role_serial % ROLE_NAMES.len()];
        let round = self.role_serial / ROLE_NAMES.len();
        self.role_serial += 1;

        let mut applies_to = AppliesTo {
            contact: self.rng.bool(),
            address: self.rng.bool(),
            email: self.rng.bool(),
            phone: self.rng.bool(),
        };
        if !applies_to.any() {
            applies_to.contact = true;
        }

        RoleFixture {
            name: if round == 0 {
                base.to_owned()
            } else {
                format!("{base} {}", round + 1)
            },
            applies_to,
            sort_order: (self.role_serial as i32) * 10,
        }
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let start = Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN);
        start + Duration::days(self.int_range_i64(0, 364))
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("erpdesk.db");
    Ok((dir, db_path))
}

pub fn customer_types() -> &'static [&'static str] {
    &CUSTOMER_TYPES
}

/// Reference date that fixtures and pinned price queries agree on.
pub fn fixture_date() -> Date {
    Date::from_calendar_date(2026, Month::February, 19).unwrap_or(Date::MIN)
}

fn item_code_prefix(noun: &str) -> String {
    noun.chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase()
}

fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}
