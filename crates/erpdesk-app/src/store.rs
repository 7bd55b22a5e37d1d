// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{ParameterList, PriceRow, Role, RoleId};

/// Database failure surfaced to the user, with the statement that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (while running {statement})")]
pub struct PersistenceError {
    pub statement: String,
    pub message: String,
}

impl PersistenceError {
    pub fn new(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            message: message.into(),
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Statements the role dialog issues. Each call is a single atomic statement.
pub trait RoleStore {
    fn next_role_id(&self) -> PersistenceResult<RoleId>;
    fn select_role(&self, role_id: RoleId) -> PersistenceResult<Option<Role>>;
    fn insert_role(&self, role: &Role) -> PersistenceResult<()>;
    fn update_role(&self, role: &Role) -> PersistenceResult<()>;
    fn delete_role(&self, role_id: RoleId) -> PersistenceResult<()>;
}

/// Query engine that renders a prices-by-customer parameter bag into rows.
pub trait PriceQuery {
    fn query_prices(&self, params: &ParameterList) -> PersistenceResult<Vec<PriceRow>>;
}
