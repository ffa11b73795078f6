//! Parameter buckets owned by every unit.

use std::fmt;

use plc_core::{ParamAddr, ParamMap, Real};

/// Which bucket of a [`ParamSet`] a parameter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Tunable, rarely changing settings.
    Config,
    /// Written by upstream connections.
    Input,
    /// Written by the unit's own execution.
    Output,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bucket::Config => "config",
            Bucket::Input => "input",
            Bucket::Output => "output",
        })
    }
}

/// The `config` / `input` / `output` parameters of one unit.
///
/// A parameter name must be unique across the input and config buckets:
/// writes from connections and operators are routed by probing which bucket
/// already declares the name, so an ambiguous name would be misrouted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    pub config: ParamMap,
    pub input: ParamMap,
    pub output: ParamMap,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, name: &str, value: Real) -> Self {
        self.config.insert(name.to_string(), value);
        self
    }

    pub fn with_input(mut self, name: &str, value: Real) -> Self {
        self.input.insert(name.to_string(), value);
        self
    }

    pub fn with_output(mut self, name: &str, value: Real) -> Self {
        self.output.insert(name.to_string(), value);
        self
    }

    pub fn bucket(&self, bucket: Bucket) -> &ParamMap {
        match bucket {
            Bucket::Config => &self.config,
            Bucket::Input => &self.input,
            Bucket::Output => &self.output,
        }
    }

    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut ParamMap {
        match bucket {
            Bucket::Config => &mut self.config,
            Bucket::Input => &mut self.input,
            Bucket::Output => &mut self.output,
        }
    }

    /// Bucket an external write to `name` lands in: input if input declares
    /// it, else config if config declares it, else input.
    pub fn route(&self, name: &str) -> Bucket {
        if self.input.contains_key(name) {
            Bucket::Input
        } else if self.config.contains_key(name) {
            Bucket::Config
        } else {
            Bucket::Input
        }
    }

    /// Write `value` into the bucket chosen by [`ParamSet::route`].
    pub fn set(&mut self, name: &str, value: Real) -> Bucket {
        let bucket = self.route(name);
        self.bucket_mut(bucket).insert(name.to_string(), value);
        bucket
    }

    /// First bucket declaring `name`, probing config, input, then output.
    pub fn declares(&self, name: &str) -> Option<Bucket> {
        [Bucket::Config, Bucket::Input, Bucket::Output]
            .into_iter()
            .find(|&b| self.bucket(b).contains_key(name))
    }

    /// Current value of `name`. Outputs shadow inputs, inputs shadow config.
    pub fn get(&self, name: &str) -> Option<Real> {
        self.output
            .get(name)
            .or_else(|| self.input.get(name))
            .or_else(|| self.config.get(name))
            .copied()
    }

    /// Value from a specific bucket, `0.0` when absent.
    pub fn value(&self, bucket: Bucket, name: &str) -> Real {
        self.bucket(bucket).get(name).copied().unwrap_or_default()
    }

    pub fn config_value(&self, name: &str) -> Real {
        self.value(Bucket::Config, name)
    }

    pub fn input_value(&self, name: &str) -> Real {
        self.value(Bucket::Input, name)
    }

    pub fn output_value(&self, name: &str) -> Real {
        self.value(Bucket::Output, name)
    }

    /// Every declared name across the three buckets, deduplicated.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .config
            .keys()
            .chain(self.input.keys())
            .chain(self.output.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Overwrite initial values from a construction map.
    ///
    /// Each name is written into whichever bucket declares it; names the
    /// unit does not declare are ignored.
    pub fn apply_initial(&mut self, type_tag: &str, values: &ParamMap) {
        for (name, &value) in values {
            match self.declares(name) {
                Some(bucket) => {
                    self.bucket_mut(bucket).insert(name.clone(), value);
                }
                None => {
                    tracing::debug!(unit = type_tag, param = %name, "ignoring undeclared parameter");
                }
            }
        }
    }

    /// Copy config and input values from `values` into the live set.
    ///
    /// Outputs are never touched, so any state the unit keeps in them
    /// survives. Returns the number of parameters written.
    pub fn update_settable(&mut self, values: &ParamMap) -> usize {
        let mut written = 0;
        for (name, &value) in values {
            let bucket = match self.declares(name) {
                Some(Bucket::Output) | None => continue,
                Some(_) => self.route(name),
            };
            self.bucket_mut(bucket).insert(name.clone(), value);
            written += 1;
        }
        written
    }

    /// All parameters keyed `instance.param`. Output values win over input
    /// and config values of the same name.
    pub fn flatten(&self, instance: &str) -> ParamMap {
        let mut flat = ParamMap::new();
        for bucket in [Bucket::Config, Bucket::Input, Bucket::Output] {
            for (name, &value) in self.bucket(bucket) {
                flat.insert(ParamAddr::new(instance, name.as_str()).key(), value);
            }
        }
        flat
    }
}
