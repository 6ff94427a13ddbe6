use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use toml::Value;

use crate::devices::{BuildParams, DeviceTable};
use crate::error::{Error, Result};

pub const ENV_BUILD_TOP: &str = "ANDROID_BUILD_TOP";
pub const ENV_TARGET_PRODUCT: &str = "TARGET_PRODUCT";
pub const ENV_TARGET_BUILD_VARIANT: &str = "TARGET_BUILD_VARIANT";

#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub path: PathBuf,
    pub value: Value,
}

impl ConfigDoc {
    pub fn empty() -> Self {
        Self {
            path: PathBuf::from("<none>"),
            value: Value::Table(Default::default()),
        }
    }

    pub fn value_path(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path.is_empty() {
            return Some(&self.value);
        }

        let mut cur = &self.value;
        for seg in path.split('.') {
            let tbl = cur.as_table()?;
            cur = tbl.get(seg)?;
        }
        Some(cur)
    }

    pub fn deserialize_path<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let Some(v) = self.value_path(path) else {
            return Ok(None);
        };
        let parsed = v
            .clone()
            .try_into()
            .map_err(|e| Error::msg(format!("failed to deserialize config at '{}': {e}", path)))?;
        Ok(Some(parsed))
    }

    pub fn build_env(&self) -> Result<BuildEnvConfig> {
        Ok(self.deserialize_path("build")?.unwrap_or_default())
    }

    pub fn device_table(&self) -> Result<DeviceTable> {
        let overrides: BTreeMap<String, BuildParams> =
            self.deserialize_path("devices")?.unwrap_or_default();
        DeviceTable::with_overrides(overrides)
    }
}

/// The `[build]` table. Unset values fall through to the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildEnvConfig {
    pub android_build_top: Option<PathBuf>,
    pub target_product: Option<String>,
    pub target_build_variant: Option<String>,
    pub shell: Option<PathBuf>,
}

impl BuildEnvConfig {
    /// Fills unset values from `ANDROID_BUILD_TOP`, `TARGET_PRODUCT` and `TARGET_BUILD_VARIANT`.
    pub fn fill_from_env(&mut self) {
        self.fill_from(|key| std::env::var(key).ok());
    }

    pub fn fill_from<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if self.android_build_top.is_none() {
            self.android_build_top = non_empty(ENV_BUILD_TOP).map(PathBuf::from);
        }
        if self.target_product.is_none() {
            self.target_product = non_empty(ENV_TARGET_PRODUCT);
        }
        if self.target_build_variant.is_none() {
            self.target_build_variant = non_empty(ENV_TARGET_BUILD_VARIANT);
        }
    }

    /// Values set in `other` win.
    pub fn overlay(&mut self, other: BuildEnvConfig) {
        if other.android_build_top.is_some() {
            self.android_build_top = other.android_build_top;
        }
        if other.target_product.is_some() {
            self.target_product = other.target_product;
        }
        if other.target_build_variant.is_some() {
            self.target_build_variant = other.target_build_variant;
        }
        if other.shell.is_some() {
            self.shell = other.shell;
        }
    }
}

fn merge_values(base: &mut Value, child: Value) {
    match (base, child) {
        (Value::Table(base_tbl), Value::Table(child_tbl)) => {
            for (k, v) in child_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (base_slot, child_val) => {
            *base_slot = child_val;
        }
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn parse_imports(path: &Path, table: &toml::value::Table) -> Result<Vec<String>> {
    let Some(arr) = table.get("imports").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for v in arr {
        let Some(s) = v.as_str() else {
            return Err(Error::msg(format!(
                "invalid imports entry in {} (expected string)",
                path.display()
            )));
        };
        let s = s.trim();
        if !s.is_empty() {
            out.push(s.to_string());
        }
    }
    Ok(out)
}

fn inline_imports(file_path: &Path, value: &mut Value, stack: &mut HashSet<PathBuf>) -> Result<()> {
    let Value::Table(tbl) = value else {
        return Ok(());
    };

    let imports = parse_imports(file_path, tbl)?;
    tbl.remove("imports");
    if !imports.is_empty() {
        let mut acc = Value::Table(Default::default());
        for imp in imports {
            let loaded = load_value_inner(&resolve_ref_path(file_path, &imp), stack)?;
            merge_values(&mut acc, loaded);
        }
        merge_values(&mut acc, Value::Table(std::mem::take(tbl)));
        if let Value::Table(merged) = acc {
            *tbl = merged;
        }
    }

    for (_, v) in tbl.iter_mut() {
        inline_imports(file_path, v, stack)?;
    }
    Ok(())
}

fn load_value_inner(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::msg(format!(
            "config import cycle detected at {}",
            canonical.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read config {}", path.display()), e))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

    let mut out = Value::Table(Default::default());
    if let Some(ext) = value.get("extends").and_then(Value::as_str) {
        out = load_value_inner(&resolve_ref_path(path, ext), stack)?;
    }
    if let Some(tbl) = value.as_table_mut() {
        tbl.remove("extends");
    }

    inline_imports(path, &mut value, stack)?;
    merge_values(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

pub fn load(path: &Path) -> Result<ConfigDoc> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value_inner(path, &mut stack)?;
    Ok(ConfigDoc {
        path: path.to_path_buf(),
        value,
    })
}
