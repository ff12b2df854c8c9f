// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthSettings, AuthenticationManager};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthenticationManager>,
}

impl AppState {
    pub fn new(manager: AuthenticationManager) -> Self {
        Self {
            auth: Arc::new(manager),
        }
    }
}

impl Default for AppState {
    /// State with no providers or domains (authentication disabled).
    fn default() -> Self {
        Self::new(AuthenticationManager::with_client(
            AuthSettings::default(),
            reqwest::Client::new(),
        ))
    }
}
