use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ANDROID_ARM64_CROSS_COMPILE: &str = "aarch64-linux-android-";

/// Compiler/config triple needed to cross-build a kernel for one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParams {
    pub arch: String,
    pub defconfig: String,
    pub cross_compile: String,
}

impl BuildParams {
    pub fn new(arch: &str, defconfig: &str, cross_compile: &str) -> Self {
        Self {
            arch: arch.into(),
            defconfig: defconfig.into(),
            cross_compile: cross_compile.into(),
        }
    }

    fn validate(&self, device: &str) -> Result<()> {
        for (field, value) in [
            ("arch", &self.arch),
            ("defconfig", &self.defconfig),
            ("cross_compile", &self.cross_compile),
        ] {
            if value.trim().is_empty() {
                return Err(Error::msg(format!("devices.{device}.{field} is empty")));
            }
        }
        Ok(())
    }
}

static DEVICE_KERNEL_BUILD_PARAMS: LazyLock<BTreeMap<&'static str, BuildParams>> =
    LazyLock::new(|| {
        BTreeMap::from([
            (
                "hikey960",
                BuildParams::new("arm64", "hikey960_defconfig", ANDROID_ARM64_CROSS_COMPILE),
            ),
            (
                "hikey",
                BuildParams::new("arm64", "hikey_defconfig", ANDROID_ARM64_CROSS_COMPILE),
            ),
        ])
    });

pub fn kernel_build_params(device: &str) -> Option<&'static BuildParams> {
    DEVICE_KERNEL_BUILD_PARAMS.get(device)
}

pub fn known_devices() -> impl Iterator<Item = &'static str> {
    DEVICE_KERNEL_BUILD_PARAMS.keys().copied()
}

/// Built-in devices plus caller-supplied entries; the built-in table itself never changes.
#[derive(Debug, Clone, Default)]
pub struct DeviceTable {
    overrides: BTreeMap<String, BuildParams>,
}

impl DeviceTable {
    pub fn with_overrides(overrides: BTreeMap<String, BuildParams>) -> Result<Self> {
        for (name, params) in &overrides {
            if name.trim().is_empty() {
                return Err(Error::msg("devices has an empty device name"));
            }
            params.validate(name)?;
        }
        Ok(Self { overrides })
    }

    pub fn get(&self, device: &str) -> Option<&BuildParams> {
        self.overrides
            .get(device)
            .or_else(|| kernel_build_params(device))
    }

    pub fn is_override(&self, device: &str) -> bool {
        self.overrides.contains_key(device)
    }

    pub fn entries(&self) -> BTreeMap<String, BuildParams> {
        let mut out: BTreeMap<String, BuildParams> = DEVICE_KERNEL_BUILD_PARAMS
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        for (k, v) in &self.overrides {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}
