// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod events;
pub mod forms;
pub mod ids;
pub mod model;
pub mod params;
pub mod prices;
pub mod role_editor;
pub mod state;
pub mod store;

pub use events::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use params::*;
pub use prices::*;
pub use role_editor::*;
pub use state::*;
pub use store::*;
