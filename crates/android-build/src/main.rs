use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use android_build::config::{self, BuildEnvConfig, ConfigDoc};
use android_build::devices::DeviceTable;
use android_build::{Build, Error, ExecutionContext, Result};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, ClapArgs)]
struct GlobalArgs {
    /// Path to a TOML config with [build] and [devices.*] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Android source tree root (overrides ANDROID_BUILD_TOP)
    #[arg(long, global = true)]
    build_top: Option<PathBuf>,
    /// Lunch product (overrides TARGET_PRODUCT)
    #[arg(long, global = true)]
    product: Option<String>,
    /// Lunch variant (overrides TARGET_BUILD_VARIANT)
    #[arg(long, global = true)]
    variant: Option<String>,
    /// Shell used to run build scripts
    #[arg(long, global = true)]
    shell: Option<PathBuf>,
    /// Log the scripts instead of running them
    #[arg(long, global = true)]
    dry_run: bool,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a platform module and its dependencies (mmma)
    Module {
        /// Module path relative to the Android tree root
        path: String,
    },
    /// Build a kernel tree with explicit parameters
    Kernel {
        /// Path to the kernel sources
        path: PathBuf,
        #[arg(long)]
        arch: String,
        #[arg(long)]
        defconfig: String,
        #[arg(long)]
        cross_compile: String,
        /// Run `make clean` first
        #[arg(long)]
        clean: bool,
    },
    /// Build a kernel tree using a known device's parameters
    Device {
        /// Path to the kernel sources
        path: PathBuf,
        /// Device name, e.g. hikey960
        device: String,
        #[arg(long)]
        clean: bool,
    },
    /// List known devices and their kernel build parameters
    Devices {
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved build environment
    Env,
}

fn main() -> Result<()> {
    let args = Args::parse();
    // A missing .env is fine.
    let _ = dotenv::dotenv();
    init_logging(args.global.log_format);

    let (env, devices) = resolve(&args.global)?;
    match args.cmd {
        Command::Module { path } => {
            let build = dispatcher(&env, args.global.dry_run)?;
            build.build_module(&path)
        }
        Command::Kernel {
            path,
            arch,
            defconfig,
            cross_compile,
            clean,
        } => {
            let build = dispatcher(&env, args.global.dry_run)?;
            build.build_kernel(&path, &arch, &defconfig, &cross_compile, clean)
        }
        Command::Device {
            path,
            device,
            clean,
        } => cmd_device(&env, &devices, args.global.dry_run, &path, &device, clean),
        Command::Devices { json } => cmd_devices(&devices, json),
        Command::Env => {
            cmd_env(&env);
            Ok(())
        }
    }
}

fn init_logging(format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

// Precedence: flags, then the config file, then the environment.
fn resolve(g: &GlobalArgs) -> Result<(BuildEnvConfig, DeviceTable)> {
    let doc = match g.config.as_ref() {
        Some(p) => config::load(p)?,
        None => ConfigDoc::empty(),
    };
    let mut env = doc.build_env()?;
    env.overlay(BuildEnvConfig {
        android_build_top: g.build_top.clone(),
        target_product: g.product.clone(),
        target_build_variant: g.variant.clone(),
        shell: g.shell.clone(),
    });
    env.fill_from_env();
    Ok((env, doc.device_table()?))
}

fn dispatcher(env: &BuildEnvConfig, dry_run: bool) -> Result<Build> {
    let mut ctx = ExecutionContext::from_config(env);
    if dry_run {
        ctx = ctx.dry_run();
    }
    Build::new(Arc::new(ctx))
}

fn cmd_device(
    env: &BuildEnvConfig,
    devices: &DeviceTable,
    dry_run: bool,
    path: &Path,
    device: &str,
    clean: bool,
) -> Result<()> {
    let build = dispatcher(env, dry_run)?;
    let built = match devices.get(device) {
        Some(p) if devices.is_override(device) => {
            build.build_kernel(path, &p.arch, &p.defconfig, &p.cross_compile, clean)?;
            true
        }
        _ => build.build_kernel_for_device(path, device, clean)?,
    };
    if !built {
        let known: Vec<String> = devices.entries().into_keys().collect();
        return Err(Error::msg(format!(
            "unknown device '{device}' (known: {})",
            known.join(", ")
        )));
    }
    Ok(())
}

fn cmd_devices(devices: &DeviceTable, json: bool) -> Result<()> {
    let entries = devices.entries();
    if json {
        let s = serde_json::to_string_pretty(&entries)
            .map_err(|e| Error::msg(format!("json encode error: {e}")))?;
        println!("{s}");
        return Ok(());
    }
    for (name, p) in &entries {
        let origin = if devices.is_override(name) { "config" } else { "builtin" };
        println!(
            "{:<12} {:<8} {:<24} {:<26} {}",
            name, p.arch, p.defconfig, p.cross_compile, origin
        );
    }
    Ok(())
}

fn cmd_env(env: &BuildEnvConfig) {
    let show = |v: Option<String>| v.unwrap_or_else(|| "<unset>".into());
    println!(
        "ANDROID_BUILD_TOP={}",
        show(env.android_build_top.as_ref().map(|p| p.display().to_string()))
    );
    println!("TARGET_PRODUCT={}", show(env.target_product.clone()));
    println!("TARGET_BUILD_VARIANT={}", show(env.target_build_variant.clone()));
    if let (Some(product), Some(variant)) = (&env.target_product, &env.target_build_variant) {
        println!("lunch target: {product}-{variant}");
    }
}
