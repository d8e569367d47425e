//! Relation data store access
//!
//! Mirrors the hook environment's data model: a relation name maps to one or
//! more relation instances (ids), each instance connects one or more remote
//! units, and each unit owns a flat string attribute map. All reads are
//! snapshots of external state; nothing is cached between calls.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;

use crate::error::{Error, Result};

/// Identifier of one relation instance (e.g. `cluster:3`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId(pub String);

impl RelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one remote unit (e.g. `neutron-api/0`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Read/write access to the relation data store.
///
/// Enumeration order is the contract consumers rely on: relation ids in the
/// order the store reports them, units in store order within each id.
pub trait RelationStore {
    /// All relation instances matching `name` (empty when none are joined)
    fn relation_ids(&self, name: &str) -> Result<Vec<RelationId>>;

    /// Remote units connected on one relation instance
    fn related_units(&self, rid: &RelationId) -> Result<Vec<UnitId>>;

    /// One attribute of one remote unit; `None` when the unit has not set it
    fn get(&self, rid: &RelationId, unit: &UnitId, key: &str) -> Result<Option<String>>;

    /// The full attribute map of one remote unit
    fn get_all(&self, rid: &RelationId, unit: &UnitId) -> Result<BTreeMap<String, String>>;

    /// Publish attributes on our side of a relation.
    ///
    /// `rid` of `None` means the relation instance of the currently
    /// executing hook.
    fn set(&self, rid: Option<&RelationId>, values: &BTreeMap<String, String>) -> Result<()>;
}

/// [`RelationStore`] backed by the hook environment tools.
///
/// Shells out to `relation-ids`, `relation-list`, `relation-get` and
/// `relation-set` with `--format=json`. Tool failure is an error; the
/// serialized hook execution model guarantees the data cannot change under
/// us within a pass.
#[derive(Debug, Default)]
pub struct HookEnv;

impl HookEnv {
    pub fn new() -> Self {
        Self
    }

    /// Run a hook tool, capturing stdout. Non-zero exit is an error with
    /// stderr folded into the message.
    fn hook_tool(command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command)
            .args(args)
            .output()
            .map_err(|e| Error::Spawn {
                command: command.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::HookTool {
                command: command.to_string(),
                message: format!(
                    "exit code {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn json_tool(command: &str, args: &[&str]) -> Result<serde_json::Value> {
        let stdout = Self::hook_tool(command, args)?;
        if stdout.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(stdout.trim())?)
    }

    /// The unit's own charm configuration, as reported by `config-get`
    pub fn config_json(&self) -> Result<serde_json::Value> {
        Self::json_tool("config-get", &["--format=json"])
    }

    /// One attribute of the local unit (e.g. `private-address`)
    pub fn unit_get(&self, attribute: &str) -> Result<String> {
        let value = Self::json_tool("unit-get", &["--format=json", attribute])?;
        match value {
            serde_json::Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

/// Convert a relation attribute value to its string form.
///
/// Relation data is stringly typed on the wire; anything else in the JSON
/// payload is rendered back to its compact form.
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl RelationStore for HookEnv {
    fn relation_ids(&self, name: &str) -> Result<Vec<RelationId>> {
        let value = Self::json_tool("relation-ids", &["--format=json", name])?;
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => Ok(items
                .iter()
                .filter_map(value_to_string)
                .map(RelationId)
                .collect()),
            other => Err(Error::Payload {
                command: "relation-ids".to_string(),
                message: format!("expected array, got {other}"),
            }),
        }
    }

    fn related_units(&self, rid: &RelationId) -> Result<Vec<UnitId>> {
        let value = Self::json_tool("relation-list", &["--format=json", "-r", rid.as_str()])?;
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => Ok(items
                .iter()
                .filter_map(value_to_string)
                .map(UnitId)
                .collect()),
            other => Err(Error::Payload {
                command: "relation-list".to_string(),
                message: format!("expected array, got {other}"),
            }),
        }
    }

    fn get(&self, rid: &RelationId, unit: &UnitId, key: &str) -> Result<Option<String>> {
        let value = Self::json_tool(
            "relation-get",
            &["--format=json", "-r", rid.as_str(), key, unit.as_str()],
        )?;
        Ok(value_to_string(&value))
    }

    fn get_all(&self, rid: &RelationId, unit: &UnitId) -> Result<BTreeMap<String, String>> {
        let value = Self::json_tool(
            "relation-get",
            &["--format=json", "-r", rid.as_str(), "-", unit.as_str()],
        )?;
        match value {
            serde_json::Value::Null => Ok(BTreeMap::new()),
            serde_json::Value::Object(map) => Ok(map
                .iter()
                .filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s)))
                .collect()),
            other => Err(Error::Payload {
                command: "relation-get".to_string(),
                message: format!("expected object, got {other}"),
            }),
        }
    }

    fn set(&self, rid: Option<&RelationId>, values: &BTreeMap<String, String>) -> Result<()> {
        let mut args: Vec<String> = Vec::new();
        if let Some(rid) = rid {
            args.push("-r".to_string());
            args.push(rid.as_str().to_string());
        }
        for (key, value) in values {
            args.push(format!("{key}={value}"));
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Self::hook_tool("relation-set", &arg_refs)?;
        Ok(())
    }
}

/// In-memory [`RelationStore`] used by tests across the workspace.
///
/// Enumeration order is deterministic (sorted by relation id, then unit id).
/// Attributes published via [`RelationStore::set`] are recorded and can be
/// inspected with [`MemoryRelations::published`].
#[derive(Debug, Default)]
pub struct MemoryRelations {
    // relation name -> relation id -> unit id -> attributes
    data: BTreeMap<String, BTreeMap<RelationId, BTreeMap<UnitId, BTreeMap<String, String>>>>,
    published: RefCell<Vec<(Option<RelationId>, BTreeMap<String, String>)>>,
}

impl MemoryRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a remote unit with no attributes yet ("joined but silent")
    pub fn add_unit(&mut self, relation: &str, rid: &str, unit: &str) -> &mut Self {
        self.data
            .entry(relation.to_string())
            .or_default()
            .entry(RelationId::from(rid))
            .or_default()
            .entry(UnitId::from(unit))
            .or_default();
        self
    }

    /// Set one attribute on a remote unit's side of a relation
    pub fn insert(
        &mut self,
        relation: &str,
        rid: &str,
        unit: &str,
        key: &str,
        value: &str,
    ) -> &mut Self {
        self.data
            .entry(relation.to_string())
            .or_default()
            .entry(RelationId::from(rid))
            .or_default()
            .entry(UnitId::from(unit))
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Everything published through [`RelationStore::set`], in call order
    pub fn published(&self) -> Vec<(Option<RelationId>, BTreeMap<String, String>)> {
        self.published.borrow().clone()
    }
}

impl RelationStore for MemoryRelations {
    fn relation_ids(&self, name: &str) -> Result<Vec<RelationId>> {
        Ok(self
            .data
            .get(name)
            .map(|rels| rels.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn related_units(&self, rid: &RelationId) -> Result<Vec<UnitId>> {
        for rels in self.data.values() {
            if let Some(units) = rels.get(rid) {
                return Ok(units.keys().cloned().collect());
            }
        }
        Ok(Vec::new())
    }

    fn get(&self, rid: &RelationId, unit: &UnitId, key: &str) -> Result<Option<String>> {
        Ok(self.get_all(rid, unit)?.get(key).cloned())
    }

    fn get_all(&self, rid: &RelationId, unit: &UnitId) -> Result<BTreeMap<String, String>> {
        for rels in self.data.values() {
            if let Some(units) = rels.get(rid)
                && let Some(attrs) = units.get(unit)
            {
                return Ok(attrs.clone());
            }
        }
        Ok(BTreeMap::new())
    }

    fn set(&self, rid: Option<&RelationId>, values: &BTreeMap<String, String>) -> Result<()> {
        self.published
            .borrow_mut()
            .push((rid.cloned(), values.clone()));
        Ok(())
    }
}
