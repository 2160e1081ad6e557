//! Alias table built from a mailmap-style file.
//!
//! Each record is `Name <canonical@email> <alias@email> [<alias@email> ...]`.
//! The first bracketed email is canonical and every later one maps to it.

use crate::error::Result;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse alias records from text. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut aliases = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let emails = bracketed(line);
            let Some((canonical, rest)) = emails.split_first().filter(|(_, rest)| !rest.is_empty()) else {
                debug!(line = idx + 1, found = emails.len(), "skipping malformed alias record");
                continue;
            };

            for alias in rest {
                aliases.insert((*alias).to_string(), (*canonical).to_string());
            }
        }

        Self { aliases }
    }

    /// Read the alias file at `path`. A missing file yields an empty table.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let table = Self::parse(&text);
                debug!(path = %path.display(), aliases = table.len(), "loaded alias table");
                Ok(table)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`AliasTable::load`], but warns when the file is absent.
    pub fn load_explicit<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "alias file not found, continuing without aliases");
        }
        Self::load(path)
    }

    /// Canonical email for `email`, or `email` itself when it is not an alias.
    pub fn resolve<'a>(&'a self, email: &'a str) -> &'a str {
        self.aliases.get(email).map(String::as_str).unwrap_or(email)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("valid regex literal"));

/// Every `<...>` substring of `line`, left to right, without the brackets.
fn bracketed(line: &str) -> Vec<&str> {
    BRACKETED
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}
