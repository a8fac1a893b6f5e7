//! The fixed catalogue of known issue/solution pairs.
//!
//! A [`Catalogue`] is the source of truth for what can be retrieved. It is
//! immutable after load and guarantees unique, canonical string ids.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{RagError, Result};
use crate::feedback::ACTION_SEPARATOR;

/// A single known issue and its solution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogueEntry {
    /// Unique identifier, in canonical string form.
    pub id: String,
    /// The issue description; this is the text that gets embedded.
    pub issue: String,
    /// The solution shown to the user when the issue matches.
    pub solution: String,
}

impl CatalogueEntry {
    /// Create a new entry.
    pub fn new(
        id: impl Into<String>,
        issue: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), issue: issue.into(), solution: solution.into() }
    }
}

/// An ordered, id-unique set of [`CatalogueEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: Vec<CatalogueEntry>,
    positions: HashMap<String, usize>,
}

impl Catalogue {
    /// Build a catalogue, keeping load order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CatalogueError`] if an id is empty, duplicated or
    /// contains the `|` feedback payload separator, or if an entry has no
    /// issue text.
    pub fn new(entries: Vec<CatalogueEntry>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(RagError::CatalogueError(format!(
                    "entry at position {position} has an empty id"
                )));
            }
            if entry.id.contains(ACTION_SEPARATOR) {
                return Err(RagError::CatalogueError(format!(
                    "id '{}' contains '{ACTION_SEPARATOR}'",
                    entry.id
                )));
            }
            if entry.issue.trim().is_empty() {
                return Err(RagError::CatalogueError(format!(
                    "entry '{}' has an empty issue",
                    entry.id
                )));
            }
            if positions.insert(entry.id.clone(), position).is_some() {
                return Err(RagError::CatalogueError(format!("duplicate id '{}'", entry.id)));
            }
        }
        Ok(Self { entries, positions })
    }

    /// Parse a catalogue from a JSON array or JSON Lines document.
    ///
    /// Each object needs `id`, `issue` and `solution` (or `solve`). Numeric
    /// ids are coerced to their integer string form.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let trimmed = input.trim_start();
        let raw: Vec<RawEntry> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)
                .map_err(|e| RagError::CatalogueError(format!("invalid JSON catalogue: {e}")))?
        } else {
            let mut raw = Vec::new();
            for (line_no, line) in input.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let entry = serde_json::from_str(line).map_err(|e| {
                    RagError::CatalogueError(format!("invalid JSON on line {}: {e}", line_no + 1))
                })?;
                raw.push(entry);
            }
            raw
        };

        let entries = raw.into_iter().map(RawEntry::into_entry).collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    /// Load a catalogue file from disk. See [`Catalogue::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RagError::CatalogueError(format!("failed to read '{}': {e}", path.display()))
        })?;
        let catalogue = Self::from_json_str(&content)?;
        info!(path = %path.display(), entries = catalogue.len(), "catalogue loaded");
        Ok(catalogue)
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<&CatalogueEntry> {
        self.positions.get(id).map(|&position| &self.entries[position])
    }

    /// All entries in load order.
    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    id: Value,
    issue: String,
    #[serde(alias = "solve")]
    solution: String,
}

impl RawEntry {
    fn into_entry(self) -> Result<CatalogueEntry> {
        let id = canonical_id(&self.id)?;
        Ok(CatalogueEntry { id, issue: self.issue, solution: self.solution })
    }
}

fn canonical_id(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                // 2^63 is exact in f64; anything at or past it would saturate
                match n.as_f64() {
                    Some(f)
                        if f.is_finite()
                            && f.fract() == 0.0
                            && f >= i64::MIN as f64
                            && f < i64::MAX as f64 =>
                    {
                        Ok(format!("{}", f as i64))
                    }
                    _ => Err(RagError::CatalogueError(format!(
                        "id {n} is not an integer in the supported range"
                    ))),
                }
            }
        }
        other => Err(RagError::CatalogueError(format!("unsupported id value: {other}"))),
    }
}
