// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Controller behind the CRM role dialog.
//!
//! The mode is fixed when the dialog is configured. `New` allocates a
//! provisional id up front; the id is reclaimed if the user cancels before
//! the first successful save.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    ChangeEvent, ChangeNotifier, DialogMode, ParameterList, PersistenceError, RoleForm, RoleId,
    RoleStore, Violation,
};

pub const RECORD_ID_KEY: &str = "crmrole_id";
pub const MODE_KEY: &str = "mode";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("cannot save CRM role: {}", join_violations(.0))]
    Validation(Vec<Violation>),
    #[error("error saving CRM role: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("save is not available while viewing a CRM role")]
    SaveUnavailable,
    #[error("CRM role fields are read-only while viewing")]
    ReadOnly,
    #[error("CRM role dialog is already closed")]
    Closed,
    #[error("invalid CRM role dialog options: {0}")]
    Configuration(String),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| violation.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogStatus {
    Open,
    Closed,
}

/// What the presentation layer should show for the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogChrome {
    pub fields_editable: bool,
    pub save_visible: bool,
    pub cancel_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Set when a provisional record could not be deleted. The dialog still closes.
    pub reclaim_error: Option<PersistenceError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEditor {
    mode: DialogMode,
    role_id: RoleId,
    form: RoleForm,
    status: DialogStatus,
}

impl RoleEditor {
    pub fn configure<S: RoleStore + ?Sized>(
        store: &S,
        options: &ParameterList,
    ) -> Result<Self, DialogError> {
        let record_id = match options.value(RECORD_ID_KEY) {
            None => None,
            Some(value) => Some(value.as_int().map(RoleId::new).ok_or_else(|| {
                DialogError::Configuration(format!("{RECORD_ID_KEY} must be an integer"))
            })?),
        };

        let raw_mode = options.text(MODE_KEY).ok_or_else(|| {
            DialogError::Configuration(format!("{MODE_KEY} is required (new, edit or view)"))
        })?;
        let mode = DialogMode::parse(raw_mode).ok_or_else(|| {
            DialogError::Configuration(format!(
                "unknown {MODE_KEY} {raw_mode:?}; expected new, edit or view"
            ))
        })?;

        if record_id.is_none() && mode != DialogMode::New {
            return Err(DialogError::Configuration(format!(
                "{} mode requires {RECORD_ID_KEY}",
                mode.as_str()
            )));
        }

        let mut editor = Self {
            mode,
            role_id: record_id.unwrap_or(RoleId::new(0)),
            form: RoleForm::default(),
            status: DialogStatus::Open,
        };

        if record_id.is_some() {
            editor.load(store)?;
        }

        match mode {
            DialogMode::New => {
                editor.role_id = store.next_role_id()?;
                debug!(role_id = %editor.role_id, "allocated provisional crm role id");
            }
            DialogMode::Edit | DialogMode::View => {}
        }

        Ok(editor)
    }

    /// Populates the form from storage. A missing record leaves the form untouched.
    pub fn load<S: RoleStore + ?Sized>(&mut self, store: &S) -> Result<bool, DialogError> {
        self.ensure_open()?;
        match store.select_role(self.role_id)? {
            Some(role) => {
                self.form = RoleForm::from_role(&role);
                Ok(true)
            }
            None => {
                debug!(role_id = %self.role_id, "crm role not found; keeping defaults");
                Ok(false)
            }
        }
    }

    pub fn validate(&self) -> Vec<Violation> {
        self.form.validate()
    }

    pub fn save<S: RoleStore + ?Sized>(
        &mut self,
        store: &S,
        notifier: &mut ChangeNotifier,
    ) -> Result<RoleId, DialogError> {
        self.ensure_open()?;
        if !self.mode.is_editable() {
            return Err(DialogError::SaveUnavailable);
        }

        let violations = self.validate();
        if !violations.is_empty() {
            return Err(DialogError::Validation(violations));
        }

        let role = self.form.to_role(self.role_id);
        let written = match self.mode {
            DialogMode::New => store.insert_role(&role),
            DialogMode::Edit => store.update_role(&role),
            DialogMode::View => return Err(DialogError::SaveUnavailable),
        };
        if let Err(error) = written {
            warn!(role_id = %self.role_id, %error, "crm role save failed");
            return Err(error.into());
        }

        info!(role_id = %self.role_id, mode = self.mode.as_str(), "saved crm role");
        notifier.publish(ChangeEvent::RolesUpdated);
        self.status = DialogStatus::Closed;
        Ok(self.role_id)
    }

    pub fn cancel<S: RoleStore + ?Sized>(&mut self, store: &S) -> Result<CancelOutcome, DialogError> {
        self.ensure_open()?;
        let reclaim_error = match self.mode {
            DialogMode::New => match store.delete_role(self.role_id) {
                Ok(()) => None,
                Err(error) => {
                    warn!(role_id = %self.role_id, %error, "could not delete provisional crm role");
                    Some(error)
                }
            },
            DialogMode::Edit | DialogMode::View => None,
        };
        self.status = DialogStatus::Closed;
        Ok(CancelOutcome { reclaim_error })
    }

    pub fn chrome(&self) -> DialogChrome {
        match self.mode {
            DialogMode::New | DialogMode::Edit => DialogChrome {
                fields_editable: true,
                save_visible: true,
                cancel_label: "Cancel",
            },
            DialogMode::View => DialogChrome {
                fields_editable: false,
                save_visible: false,
                cancel_label: "Close",
            },
        }
    }

    pub fn form(&self) -> &RoleForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> Result<&mut RoleForm, DialogError> {
        self.ensure_open()?;
        if !self.mode.is_editable() {
            return Err(DialogError::ReadOnly);
        }
        Ok(&mut self.form)
    }

    pub fn mode(&self) -> DialogMode {
        self.mode
    }

    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    pub fn status(&self) -> DialogStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == DialogStatus::Open
    }

    fn ensure_open(&self) -> Result<(), DialogError> {
        match self.status {
            DialogStatus::Open => Ok(()),
            DialogStatus::Closed => Err(DialogError::Closed),
        }
    }
}
