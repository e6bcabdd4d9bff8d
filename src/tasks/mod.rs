// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod cancel;
pub mod manager;
pub mod pipeline;

pub use manager::{CreateTaskRequest, TaskError, TaskManager};
