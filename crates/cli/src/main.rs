//! NPU kernel validation CLI.
//!
//! This binary provides a single entry point for the simulated runtime. It performs:
//! 1. **Run:** Compile a kernel set from a manifest directory, bind its
//!    orchestration, and validate it against a golden module.
//! 2. **Demo:** Run the built-in native kernel set end to end, no compiler
//!    required.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use npusim_core::config::{DeviceContext, DeviceLaunchConfig, KernelManifest, Platform};
use npusim_core::demo;
use npusim_core::exec::extract_code_section;
use npusim_core::golden::{builtin_module, builtin_names};
use npusim_core::harness::{Harness, KernelSource, KernelSpec, OrchSource, RunReport, RuntimeSpec};
use npusim_core::toolchain::Toolchain;

#[derive(Parser, Debug)]
#[command(
    name = "npusim",
    author,
    version,
    about = "NPU kernel validation on a thread-based device simulation",
    long_about = "Compile a kernel set, load it into the simulated runtime, and compare its outputs against a golden reference.\n\nExamples:\n  npusim run --kernels kernels/addmul --golden addmul\n  npusim run --kernels kernels/addmul --golden addmul --aicpu-threads 3 --block-dim 3\n  npusim demo --size 16384"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Platform selector mirrored into [`Platform`].
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlatformArg {
    /// Hardware target (manifest bookkeeping only).
    A2a3,
    /// Thread-based host simulation.
    A2a3sim,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::A2a3 => Platform::A2a3,
            PlatformArg::A2a3sim => Platform::A2a3Sim,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a kernel set and validate it against a golden module.
    Run {
        /// Kernel directory containing kernels.json and the sources.
        #[arg(short, long)]
        kernels: PathBuf,

        /// Golden module name (see `npusim list-golden`).
        #[arg(short, long)]
        golden: String,

        /// Device to run against.
        #[arg(long, default_value_t = 0)]
        device: u32,

        /// Platform selector.
        #[arg(long, value_enum, default_value_t = PlatformArg::A2a3sim)]
        platform: PlatformArg,

        /// Control threads per launch.
        #[arg(long)]
        aicpu_threads: Option<u32>,

        /// Compute blocks per launch.
        #[arg(long)]
        block_dim: Option<u32>,

        /// Extra include directory for kernel compilation (repeatable).
        #[arg(short = 'I', long = "include")]
        include_dirs: Vec<PathBuf>,

        /// JSON case file overriding the golden module's parameter list
        /// and tolerances.
        #[arg(long)]
        cases: Option<PathBuf>,
    },

    /// Run the built-in native kernel set (no compiler needed).
    Demo {
        /// Element count per tensor.
        #[arg(long, default_value_t = 16384)]
        size: usize,

        /// Use the chained (scratch-staged) orchestration instead of the
        /// fused one.
        #[arg(long)]
        chain: bool,
    },

    /// List the built-in golden modules.
    ListGolden,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run {
            kernels,
            golden,
            device,
            platform,
            aicpu_threads,
            block_dim,
            include_dirs,
            cases,
        } => cmd_run(
            &kernels,
            &golden,
            device,
            platform.into(),
            aicpu_threads,
            block_dim,
            &include_dirs,
            cases.as_deref(),
        ),
        Commands::Demo { size, chain } => cmd_demo(size, chain),
        Commands::ListGolden => {
            for name in builtin_names() {
                println!("{name}");
            }
            return;
        }
    };

    match outcome {
        Ok(report) => {
            print_report(&report);
            if !report.passed() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Case-file overrides for a golden module.
#[derive(Debug, Default, Deserialize)]
struct CaseFile {
    #[serde(default)]
    params_list: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    rtol: Option<f32>,
    #[serde(default)]
    atol: Option<f32>,
}

impl CaseFile {
    fn load(path: &Path) -> npusim_core::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            npusim_core::RuntimeError::Golden(format!("case file {}: {e}", path.display()))
        })
    }
}

/// Compiles the manifest's kernel set and runs the validation cases.
#[allow(clippy::too_many_arguments)]
fn cmd_run(
    kernel_dir: &Path,
    golden_name: &str,
    device_id: u32,
    platform: Platform,
    aicpu_threads: Option<u32>,
    block_dim: Option<u32>,
    include_dirs: &[PathBuf],
    cases: Option<&Path>,
) -> npusim_core::Result<RunReport> {
    let golden = builtin_module(golden_name).ok_or_else(|| {
        npusim_core::RuntimeError::Golden(format!(
            "unknown golden module `{golden_name}` (available: {})",
            builtin_names().join(", ")
        ))
    })?;

    let manifest = KernelManifest::load(&kernel_dir.join("kernels.json"))?;
    let toolchain = Toolchain::discover()?;

    let mut kernels = Vec::with_capacity(manifest.kernels.len());
    for entry in &manifest.kernels {
        let source = kernel_dir.join(&entry.source);
        println!(
            "[*] compiling kernel func_id={} ({}, {})",
            entry.func_id,
            entry.core_type,
            source.display()
        );
        let object = toolchain.compile_incore(&source, entry.core_type, include_dirs)?;
        let code = extract_code_section(&object)?;
        kernels.push(KernelSpec {
            func_id: entry.func_id,
            core_type: entry.core_type,
            source: KernelSource::Code(code),
        });
    }

    let orch_source = kernel_dir.join(&manifest.orchestration.source);
    println!("[*] compiling orchestration ({})", orch_source.display());
    let library = toolchain.compile_orchestration(&orch_source, include_dirs)?;

    let spec = RuntimeSpec {
        kernels,
        orchestration: OrchSource::SharedLibrary {
            bytes: library,
            entry_symbol: manifest.orchestration.function_name.clone(),
        },
        required_func_ids: manifest.orchestration.required_func_ids.clone(),
    };

    let device = DeviceContext::select(device_id, platform);
    let (default_rtol, default_atol) = (golden.rtol(), golden.atol());
    let mut harness = Harness::new(golden, spec, device);
    if let Some(path) = cases {
        let file = CaseFile::load(path)?;
        if let Some(params) = file.params_list {
            harness = harness.with_params(params);
        }
        if file.rtol.is_some() || file.atol.is_some() {
            harness = harness.with_tolerances(
                file.rtol.unwrap_or(default_rtol),
                file.atol.unwrap_or(default_atol),
            );
        }
    }
    if aicpu_threads.is_some() || block_dim.is_some() {
        let mut launch = DeviceLaunchConfig {
            device_id,
            ..DeviceLaunchConfig::default()
        };
        if let Some(n) = aicpu_threads {
            launch.aicpu_thread_num = n;
        }
        if let Some(n) = block_dim {
            launch.block_dim = n;
        }
        harness = harness.with_launch(launch);
    }

    harness.run_all()
}

/// Runs the built-in kernel set against the addmul golden module.
fn cmd_demo(size: usize, chain: bool) -> npusim_core::Result<RunReport> {
    let golden = builtin_module("addmul").expect("addmul is built in");
    let spec = if chain {
        demo::runtime_spec_chain()
    } else {
        demo::runtime_spec_fused()
    };

    println!(
        "[*] demo: f = (a + b + 1) * (a + b + 2), {} orchestration, {size} elements",
        if chain { "chained" } else { "fused" }
    );

    let device = DeviceContext::select(0, Platform::A2a3Sim);
    let harness = Harness::new(golden, spec, device)
        .with_params(vec![serde_json::json!({ "size": size, "seed": 42 })]);
    harness.run_all()
}

/// Prints the per-case results.
fn print_report(report: &RunReport) {
    for (i, case) in report.cases.iter().enumerate() {
        let status = if case.passed() { "PASS" } else { "FAIL" };
        println!("case {}/{}: {status}  params={}", i + 1, report.cases.len(), case.params);
        for check in &case.outputs {
            println!(
                "    output `{}`: {}/{} elements out of tolerance",
                check.name, check.mismatches, check.elements
            );
        }
    }
    println!();
    if report.passed() {
        println!("all {} case(s) passed", report.cases.len());
    } else {
        let failed = report.cases.iter().filter(|c| !c.passed()).count();
        println!("{failed}/{} case(s) failed", report.cases.len());
    }
}
