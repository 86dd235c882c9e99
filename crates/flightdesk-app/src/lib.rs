// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod forms;
pub mod fragment;
pub mod ids;
pub mod model;
pub mod notice;
pub mod query;
pub mod render;
pub mod state;

pub use controller::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use notice::*;
pub use query::*;
pub use render::*;
pub use state::*;
