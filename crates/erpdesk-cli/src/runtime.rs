// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use erpdesk_app::{
    Customer, Item, ParameterList, PersistenceResult, PriceQuery, PriceRow, Role, RoleId,
    RoleStore,
};
use erpdesk_db::Store;

pub struct DbRuntime<'a> {
    store: &'a Store,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl RoleStore for DbRuntime<'_> {
    fn next_role_id(&self) -> PersistenceResult<RoleId> {
        RoleStore::next_role_id(self.store)
    }

    fn select_role(&self, role_id: RoleId) -> PersistenceResult<Option<Role>> {
        self.store.select_role(role_id)
    }

    fn insert_role(&self, role: &Role) -> PersistenceResult<()> {
        self.store.insert_role(role)
    }

    fn update_role(&self, role: &Role) -> PersistenceResult<()> {
        RoleStore::update_role(self.store, role)
    }

    fn delete_role(&self, role_id: RoleId) -> PersistenceResult<()> {
        RoleStore::delete_role(self.store, role_id)
    }
}

impl PriceQuery for DbRuntime<'_> {
    fn query_prices(&self, params: &ParameterList) -> PersistenceResult<Vec<PriceRow>> {
        self.store.query_prices(params)
    }
}

impl erpdesk_tui::AppRuntime for DbRuntime<'_> {
    fn list_roles(&mut self) -> Result<Vec<Role>> {
        self.store.list_roles()
    }

    fn list_customers(&mut self) -> Result<Vec<Customer>> {
        self.store.list_customers()
    }

    fn list_items(&mut self) -> Result<Vec<Item>> {
        self.store.list_items()
    }
}

#[cfg(test)]
mod tests {
    use super::DbRuntime;
    use anyhow::Result;
    use erpdesk_app::{ChangeNotifier, MODE_KEY, ParameterList, PricesByCustomer, RoleEditor};
    use erpdesk_db::Store;
    use erpdesk_testkit::fixture_date;
    use erpdesk_tui::AppRuntime;

    #[test]
    fn dialog_saves_through_runtime() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let mut runtime = DbRuntime::new(&store);

        let mut editor = RoleEditor::configure(&runtime, &ParameterList::new().with(MODE_KEY, "new"))?;
        {
            let form = editor.form_mut()?;
            form.name = "Receiving".to_owned();
            form.applies_to.address = true;
        }
        let role_id = editor.save(&runtime, &mut ChangeNotifier::new())?;

        let roles = runtime.list_roles()?;
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, role_id);
        Ok(())
    }

    #[test]
    fn demo_catalog_yields_prices_for_first_customer() -> Result<()> {
        let mut store = Store::open_memory()?;
        store.bootstrap()?;
        store.set_price_date(fixture_date());
        crate::demo::seed(&store, 7)?;

        let mut runtime = DbRuntime::new(&store);
        let customers = runtime.list_customers()?;
        assert!(!customers.is_empty());
        assert!(!runtime.list_items()?.is_empty());

        let mut screen = PricesByCustomer::new(true);
        screen.set_customer(Some(customers[0].id));
        let count = screen.run(&runtime)?;
        assert!(count > 0, "expected demo prices for {}", customers[0].number);
        Ok(())
    }
}
