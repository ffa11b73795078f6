//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;

use plc_core::{CoreResult, ParamAddr, ParamMap, ParamValue, Real};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::migrate::{RawConfig, RawConnection};

pub const DEFAULT_CYCLE_PERIOD: Real = 0.5;

/// Declarative plant configuration.
///
/// Reads the canonical layout as well as the legacy one (`cycle_time`,
/// separate `models:` / `algorithms:` maps, four-field connections); always
/// writes the canonical layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConfig")]
pub struct PlcConfig {
    #[serde(rename = "cyclePeriodSeconds")]
    pub cycle_period: Real,
    pub instances: InstanceTable,
    pub connections: Vec<ConnectionDef>,
    #[serde(rename = "executionOrder", skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<Vec<String>>,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLE_PERIOD)
    }
}

impl PlcConfig {
    pub fn new(cycle_period: Real) -> Self {
        Self {
            cycle_period,
            instances: InstanceTable::new(),
            connections: Vec::new(),
            execution_order: None,
        }
    }

    pub fn with_instance(mut self, name: &str, def: InstanceDef) -> Self {
        self.instances.insert(name, def);
        self
    }

    pub fn with_connection(mut self, from: &str, to: &str) -> Self {
        self.connections.push(ConnectionDef::new(from, to));
        self
    }

    pub fn with_execution_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execution_order = Some(order.into_iter().map(Into::into).collect());
        self
    }
}

/// One instance: a type tag and its initial parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDef {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl InstanceDef {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Numeric parameters only; text values never reach a unit.
    pub fn numeric_params(&self) -> ParamMap {
        self.params
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
            .collect()
    }
}

/// Instance map that keeps declaration order.
///
/// Declaration order decides circuit names and the tie-breaking of the
/// topological sort, so it must survive a load/save round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceTable {
    entries: Vec<(String, InstanceDef)>,
}

impl InstanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&InstanceDef> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut InstanceDef> {
        self.position(name).map(|i| &mut self.entries[i].1)
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn insert(&mut self, name: &str, def: InstanceDef) -> Option<InstanceDef> {
        match self.position(name) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, def)),
            None => {
                self.entries.push((name.to_string(), def));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<InstanceDef> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstanceDef)> + '_ {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }
}

impl<S: Into<String>> FromIterator<(S, InstanceDef)> for InstanceTable {
    fn from_iter<T: IntoIterator<Item = (S, InstanceDef)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (name, def) in iter {
            table.insert(&name.into(), def);
        }
        table
    }
}

impl Serialize for InstanceTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, def) in &self.entries {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for InstanceTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = InstanceTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of instance name to instance definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = InstanceTable::new();
                while let Some((name, def)) = access.next_entry::<String, InstanceDef>()? {
                    if table.insert(&name, def).is_some() {
                        tracing::warn!(instance = %name, "duplicate instance definition, last one wins");
                    }
                }
                Ok(table)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(InstanceTable::new())
            }
        }

        deserializer.deserialize_any(TableVisitor)
    }
}

/// A data route `source.param -> target.param`.
///
/// Endpoints are kept as written and parsed on use, so a malformed endpoint
/// only disables its own connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawConnection")]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
}

impl ConnectionDef {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn source(&self) -> CoreResult<ParamAddr> {
        ParamAddr::parse(&self.from)
    }

    pub fn target(&self) -> CoreResult<ParamAddr> {
        ParamAddr::parse(&self.to)
    }

    /// Both endpoints, parsed.
    pub fn endpoints(&self) -> CoreResult<(ParamAddr, ParamAddr)> {
        Ok((self.source()?, self.target()?))
    }

    /// `true` when either endpoint addresses `instance`.
    pub fn touches(&self, instance: &str) -> bool {
        ParamAddr::key_belongs_to(&self.from, instance)
            || ParamAddr::key_belongs_to(&self.to, instance)
    }
}

impl fmt::Display for ConnectionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
