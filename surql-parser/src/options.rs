// Copyright 2025 ScopeDB, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The credential level threaded through parsing and the auth gate that
//! statement parsers call through before consuming any further tokens.

use crate::error::{ParseError, Result};

/// Smaller is more privileged: a root (`KV`) connection can do anything an
/// `NS`, `DB`, or scoped (`SC`) connection can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthLevel {
    Kv = 0,
    Ns = 1,
    Db = 2,
    Sc = 3,
    No = 4,
}

/// Which namespaces/databases a session is permitted to select, per
/// [`AuthLevel`]. `None` means "no restriction" (wildcard).
#[derive(Debug, Clone, Default)]
pub struct Possible {
    pub ns: Option<String>,
    pub db: Option<String>,
}

impl Possible {
    fn permits(restriction: &Option<String>, name: &str) -> bool {
        match restriction {
            None => true,
            Some(allowed) => allowed == "*" || allowed == name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selected {
    pub ns: Option<String>,
    pub db: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub kv_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { kv_path: String::new() }
    }
}

/// The credential and connection context a parse runs against. Outlives
/// any individual parse; `USE` is the only statement that mutates it.
#[derive(Debug, Clone)]
pub struct Session {
    pub kind: AuthLevel,
    pub possible: Possible,
    pub selected: Selected,
    pub config: SessionConfig,
}

impl Session {
    pub fn new(kind: AuthLevel) -> Self {
        Session {
            kind,
            possible: Possible::default(),
            selected: Selected::default(),
            config: SessionConfig::default(),
        }
    }

    pub fn with_possible(mut self, ns: impl Into<String>, db: impl Into<String>) -> Self {
        self.possible.ns = Some(ns.into());
        self.possible.db = Some(db.into());
        self
    }

    /// The KV/NS/DB triple required to run a statement at `required`, or
    /// the gate's error if the session isn't privileged or configured
    /// enough to satisfy it.
    pub fn get(&self, required: AuthLevel) -> Result<(String, Option<String>, Option<String>)> {
        if self.kind > required {
            return Err(ParseError::Query);
        }
        if required >= AuthLevel::Ns && (self.selected.ns.is_none() || self.selected.db.is_none()) {
            return Err(ParseError::Blank);
        }
        Ok((self.config.kv_path.clone(), self.selected.ns.clone(), self.selected.db.clone()))
    }

    /// Called by the `USE` statement parser: selects a namespace if the
    /// session's `possible.ns` permits it.
    pub fn use_ns(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !Possible::permits(&self.possible.ns, &name) {
            return Err(ParseError::Perms { resource: name });
        }
        self.selected.ns = Some(name);
        Ok(())
    }

    /// Called by the `USE` statement parser: selects a database if the
    /// session's `possible.db` permits it.
    pub fn use_db(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !Possible::permits(&self.possible.db, &name) {
            return Err(ParseError::Perms { resource: name });
        }
        self.selected.db = Some(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_rejects_underprivileged_session() {
        let session = Session::new(AuthLevel::No);
        assert_eq!(session.get(AuthLevel::Db), Err(ParseError::Query));
    }

    #[test]
    fn gate_requires_selection_at_ns_and_above() {
        let session = Session::new(AuthLevel::Kv);
        assert_eq!(session.get(AuthLevel::Ns), Err(ParseError::Blank));
    }

    #[test]
    fn use_respects_wildcard_and_exact_possible() {
        let mut session = Session::new(AuthLevel::Ns).with_possible("*", "*");
        assert!(session.use_ns("acme").is_ok());
        assert!(session.use_db("main").is_ok());
        assert_eq!(session.selected.ns.as_deref(), Some("acme"));

        let mut restricted = Session::new(AuthLevel::Ns).with_possible("other", "*");
        assert_eq!(
            restricted.use_ns("acme"),
            Err(ParseError::Perms { resource: "acme".to_string() })
        );
    }
}
