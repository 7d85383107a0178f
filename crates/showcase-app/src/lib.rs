// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod attachment;
pub mod chrome;
pub mod ids;
pub mod model;
pub mod overlay;
pub mod quota;
pub mod state;

pub use attachment::*;
pub use chrome::*;
pub use ids::*;
pub use model::*;
pub use overlay::*;
pub use quota::*;
pub use state::*;
