// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use erpdesk_app::{CustomerTypeId, ItemId, Role};
use erpdesk_db::{
    NewCustomer, NewCustomerType, NewItem, NewPriceSchedule, NewScheduleLine, PriceAssignment,
    Store,
};
use erpdesk_testkit::{CatalogFaker, ItemFixture, customer_types};
use std::collections::BTreeMap;
use time::Duration;
use tracing::info;

const DEMO_ROLES: usize = 6;
const DEMO_ITEMS: usize = 10;
const DEMO_CUSTOMERS: usize = 8;
const WHOLESALE_PATTERN: &str = "WHSL-*";

/// Fills an empty store with a small catalog priced around the store's price date.
pub fn seed(store: &Store, seed: u64) -> Result<()> {
    let mut faker = CatalogFaker::new(seed);
    let as_of = store.price_date();

    for _ in 0..DEMO_ROLES {
        let fixture = faker.role();
        store
            .create_role(&Role {
                id: store.next_role_id()?,
                name: fixture.name,
                applies_to: fixture.applies_to,
                sort_order: fixture.sort_order,
            })
            .context("seed demo roles")?;
    }

    let mut type_ids = BTreeMap::<&str, CustomerTypeId>::new();
    for code in customer_types() {
        let id = store.create_customer_type(&NewCustomerType {
            code: (*code).to_owned(),
        })?;
        type_ids.insert(*code, id);
    }

    let items = (0..DEMO_ITEMS)
        .map(|_| {
            let fixture = faker.item();
            let id = store.create_item(&NewItem {
                number: fixture.number.clone(),
                description: fixture.description.clone(),
                price_uom: fixture.price_uom.clone(),
                list_price: fixture.list_price,
                standard_cost: fixture.standard_cost,
                actual_cost: fixture.actual_cost,
            })?;
            Ok((id, fixture))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut customers = Vec::with_capacity(DEMO_CUSTOMERS);
    for index in 0..DEMO_CUSTOMERS {
        let code = customer_types()[index % customer_types().len()];
        let fixture = faker.customer(code);
        let customer_type_id = type_ids
            .get(code)
            .copied()
            .context("demo customer type missing")?;
        let id = store.create_customer(&NewCustomer {
            number: fixture.number,
            name: fixture.name,
            customer_type_id,
        })?;
        customers.push(id);
    }

    let current = as_of - Duration::days(60);
    let expired = as_of - Duration::days(400);
    let future = as_of + Duration::days(30);

    let mut assignments = customers
        .iter()
        .take(2)
        .map(|id| (current, PriceAssignment::Customer(*id)))
        .collect::<Vec<_>>();
    if let Some(first) = customers.first() {
        assignments.push((expired, PriceAssignment::Customer(*first)));
        assignments.push((future, PriceAssignment::Customer(*first)));
    }
    assignments.extend(
        type_ids
            .values()
            .map(|id| (current, PriceAssignment::CustomerType(*id))),
    );
    assignments.push((
        current,
        PriceAssignment::CustomerTypePattern(WHOLESALE_PATTERN.to_owned()),
    ));

    for (effective, assignment) in &assignments {
        let fixture = faker.schedule(*effective);
        let schedule_id = store.create_price_schedule(&NewPriceSchedule {
            name: fixture.name,
            effective: fixture.effective,
            expires: fixture.expires,
            currency: fixture.currency,
        })?;
        for (item_id, item) in pick_items(&mut faker, &items) {
            for qty_break in [0.0, 100.0] {
                let line = faker.schedule_line(item, qty_break);
                store.add_schedule_line(
                    schedule_id,
                    &NewScheduleLine {
                        item_id,
                        qty_break: line.qty_break,
                        price: line.price,
                    },
                )?;
            }
        }
        store.assign_price_schedule(schedule_id, assignment)?;
    }

    info!(
        roles = DEMO_ROLES,
        items = items.len(),
        customers = customers.len(),
        schedules = assignments.len(),
        "seeded demo catalog"
    );
    Ok(())
}

fn pick_items<'a>(
    faker: &mut CatalogFaker,
    items: &'a [(ItemId, ItemFixture)],
) -> Vec<(ItemId, &'a ItemFixture)> {
    let count = 2 + faker.int_n(3);
    let start = faker.int_n(items.len());
    (0..count.min(items.len()))
        .map(|offset| {
            let (id, fixture) = &items[(start + offset) % items.len()];
            (*id, fixture)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::seed;
    use anyhow::Result;
    use erpdesk_db::Store;
    use erpdesk_testkit::fixture_date;

    #[test]
    fn seed_fills_every_table() -> Result<()> {
        let mut store = Store::open_memory()?;
        store.bootstrap()?;
        store.set_price_date(fixture_date());
        seed(&store, 11)?;

        assert_eq!(store.list_roles()?.len(), super::DEMO_ROLES);
        assert_eq!(store.list_items()?.len(), super::DEMO_ITEMS);
        assert_eq!(store.list_customers()?.len(), super::DEMO_CUSTOMERS);
        assert!(!store.list_customer_types()?.is_empty());
        Ok(())
    }

    #[test]
    fn seed_is_deterministic() -> Result<()> {
        let mut left = Store::open_memory()?;
        left.bootstrap()?;
        left.set_price_date(fixture_date());
        seed(&left, 3)?;

        let mut right = Store::open_memory()?;
        right.bootstrap()?;
        right.set_price_date(fixture_date());
        seed(&right, 3)?;

        assert_eq!(left.list_items()?, right.list_items()?);
        assert_eq!(left.list_roles()?, right.list_roles()?);
        Ok(())
    }
}
