// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Shared data model for the worker node: modules, personas, deployments,
//! runs and the consumers that dispatch them.

pub use self::consumer::Consumer;
pub use self::deployment::Deployment;
pub use self::module::{Module, ModuleKind, ModuleSource, PersonaSource};
pub use self::node::NodeRecord;
pub use self::run::{Run, RunKind, RunStatus};

pub mod consumer;
pub mod deployment;
pub mod module;
pub mod node;
pub mod run;
