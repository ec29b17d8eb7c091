// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model provider abstraction layer
//!
//! Contains the provider trait, message types, the model capability table,
//! and concrete provider implementations.

pub mod message;
pub mod mock_provider;
pub mod provider;
pub mod providers;
pub mod registry;
