//! Compiler toolchain collaborator.
//!
//! Turns kernel and orchestration source into the binary artifacts the
//! runtime loads: relocatable objects for incore kernels (their executable
//! section is extracted and mapped) and shared libraries for orchestration
//! (dlopen'd and entered by symbol). Any non-zero compiler exit is a fatal
//! build failure carrying the stage and the captured stderr.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::common::{CoreType, Result, RuntimeError};

/// Host compilers probed in order by [`Toolchain::discover`].
const COMPILER_CANDIDATES: &[&str] = &["c++", "g++", "clang++"];

/// A located host C++ compiler.
#[derive(Clone, Debug)]
pub struct Toolchain {
    cxx: PathBuf,
}

impl Toolchain {
    /// Locates a host compiler on `PATH`.
    pub fn discover() -> Result<Self> {
        for candidate in COMPILER_CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                tracing::debug!(compiler = %path.display(), "toolchain discovered");
                return Ok(Self { cxx: path });
            }
        }
        Err(RuntimeError::Build {
            stage: "discover".into(),
            detail: format!("no host compiler found (tried {COMPILER_CANDIDATES:?})"),
        })
    }

    /// Uses an explicit compiler path.
    pub fn with_compiler(cxx: PathBuf) -> Self {
        Self { cxx }
    }

    /// Compiles an incore kernel source to a relocatable object.
    ///
    /// Returns the object-file bytes; pass them through
    /// [`extract_code_section`](crate::exec::extract_code_section) before
    /// registration. The targeted role is exposed to the source as a
    /// `CORE_TYPE_*` define.
    pub fn compile_incore(
        &self,
        source: &Path,
        core_type: CoreType,
        include_dirs: &[PathBuf],
    ) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("kernel.o");

        let mut cmd = Command::new(&self.cxx);
        let _ = cmd
            .arg("-std=c++17")
            .arg("-O2")
            .arg("-fPIC")
            .arg("-ffreestanding")
            .arg("-fno-exceptions")
            .arg(format!("-DCORE_TYPE_{}", core_type.to_string().to_uppercase()))
            .arg("-c")
            .arg(source)
            .arg("-o")
            .arg(&out);
        for inc in include_dirs {
            let _ = cmd.arg("-I").arg(inc);
        }
        run(&mut cmd, "compile_incore")?;

        Ok(std::fs::read(&out)?)
    }

    /// Compiles an orchestration source to a shared library.
    pub fn compile_orchestration(
        &self,
        source: &Path,
        include_dirs: &[PathBuf],
    ) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("orchestration.so");

        let mut cmd = Command::new(&self.cxx);
        let _ = cmd
            .arg("-std=c++17")
            .arg("-O2")
            .arg("-fPIC")
            .arg("-shared")
            .arg(source)
            .arg("-o")
            .arg(&out);
        for inc in include_dirs {
            let _ = cmd.arg("-I").arg(inc);
        }
        run(&mut cmd, "compile_orchestration")?;

        Ok(std::fs::read(&out)?)
    }
}

/// Runs a compiler command; non-zero exit becomes a build failure.
fn run(cmd: &mut Command, stage: &str) -> Result<()> {
    tracing::debug!(?cmd, stage, "running compiler");
    let out = cmd.output().map_err(|e| RuntimeError::Build {
        stage: stage.into(),
        detail: e.to_string(),
    })?;
    if !out.status.success() {
        return Err(RuntimeError::Build {
            stage: stage.into(),
            detail: format!(
                "{}\n{}",
                out.status,
                String::from_utf8_lossy(&out.stderr)
            ),
        });
    }
    Ok(())
}
