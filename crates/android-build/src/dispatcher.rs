use std::path::Path;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::devices;
use crate::error::{Error, Result};
use crate::workdir::WorkDirGuard;

pub const MODULE_BUILD_JOBS: usize = 16;
pub const KERNEL_BUILD_JOBS: usize = 24;

/// `lunch <target>` then `mmma` the module, all in one shell so the environment carries over.
pub fn module_build_script(lunch_target: &str, module_path: &str) -> String {
    format!(
        "source build/envsetup.sh && lunch {lunch_target} && mmma -j{MODULE_BUILD_JOBS} {module_path}"
    )
}

/// One script per step, each run in its own shell.
pub fn kernel_build_scripts(
    arch: &str,
    defconfig: &str,
    cross_compile: &str,
    clean: bool,
) -> Vec<String> {
    let mut out = vec![". ./build.config".to_string()];
    if clean {
        out.push("make clean".into());
    }
    out.push(format!("make ARCH={arch} {defconfig}"));
    out.push(format!(
        "make -j{KERNEL_BUILD_JOBS} ARCH={arch} CROSS_COMPILE={cross_compile}"
    ));
    out
}

/// Android platform and kernel build actions.
///
/// Toolchain exit statuses are not inspected: a returned `Ok` means the
/// commands were dispatched, not that the build succeeded. `Err` is reserved
/// for local failures such as an unusable working directory or a shell that
/// cannot be spawned.
pub struct Build {
    ctx: Arc<ExecutionContext>,
}

impl Build {
    pub fn new(ctx: Arc<ExecutionContext>) -> Result<Self> {
        let missing = ctx.missing_fields();
        if !missing.is_empty() {
            ctx.log.warning(&format!(
                "Build initialization failed: invalid parameters (missing {})",
                missing.join(", ")
            ));
            return Err(Error::Configuration { missing });
        }
        Ok(Self { ctx })
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn lunch_target(&self) -> String {
        format!(
            "{}-{}",
            self.ctx.target_product().unwrap_or_default(),
            self.ctx.target_build_variant().unwrap_or_default()
        )
    }

    /// Builds a module and its dependencies from the root of the Android tree.
    pub fn build_module(&self, module_path: &str) -> Result<()> {
        self.ctx.log.info(&format!("BUILDING module {module_path}"));
        let top = self
            .ctx
            .android_build_top()
            .ok_or_else(|| Error::Configuration {
                missing: vec!["android_build_top"],
            })?;
        let script = module_build_script(&self.lunch_target(), module_path);

        let _cwd = WorkDirGuard::enter(top)?;
        self.dispatch(&script)
    }

    pub fn build_kernel(
        &self,
        kernel_path: &Path,
        arch: &str,
        defconfig: &str,
        cross_compile: &str,
        clean: bool,
    ) -> Result<()> {
        self.ctx
            .log
            .info(&format!("BUILDING kernel @ {}", kernel_path.display()));

        let _cwd = WorkDirGuard::enter(kernel_path)?;
        for script in kernel_build_scripts(arch, defconfig, cross_compile, clean) {
            self.dispatch(&script)?;
        }
        Ok(())
    }

    /// Returns `Ok(false)` without touching anything when the device is not in the table.
    pub fn build_kernel_for_device(
        &self,
        kernel_path: &Path,
        device_name: &str,
        clean: bool,
    ) -> Result<bool> {
        let Some(params) = devices::kernel_build_params(device_name) else {
            return Ok(false);
        };
        self.build_kernel(
            kernel_path,
            &params.arch,
            &params.defconfig,
            &params.cross_compile,
            clean,
        )?;
        Ok(true)
    }

    fn dispatch(&self, script: &str) -> Result<()> {
        let status = self.ctx.runner.run_shell(script)?;
        if !status.success() {
            // Not surfaced to callers; kept for diagnosis only.
            tracing::debug!(script, %status, "command exited unsuccessfully");
        }
        Ok(())
    }
}
