//! Staging of the build context directory

use super::constants::{context_file_name, DEFAULT_KEYRING_NAME};
use super::options::BuildOptions;
use super::plan::BuildPlan;
use crate::definition::{AdditionalBuildFile, Definition, DependencyKind};
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Helper scripts copied into every build context, run inside the images
pub const HELPER_SCRIPTS: [(&str, &str); 4] = [
    ("assemble", include_str!("../../assets/scripts/assemble")),
    (
        "get-extras-packages",
        include_str!("../../assets/scripts/get-extras-packages"),
    ),
    (
        "install-from-bindep",
        include_str!("../../assets/scripts/install-from-bindep"),
    ),
    ("introspect.py", include_str!("../../assets/scripts/introspect.py")),
];

/// What staging did to each destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Destinations that were created or rewritten
    pub written: Vec<PathBuf>,
    /// Destinations that already held identical content
    pub unchanged: Vec<PathBuf>,
    /// Additional build file sources with nothing to copy
    pub skipped: Vec<String>,
}

impl StagingReport {
    fn record(&mut self, dest: PathBuf, written: bool) {
        if written {
            self.written.push(dest);
        } else {
            self.unchanged.push(dest);
        }
    }
}

/// The build context directory the build file and staged content live in
pub struct BuildContext<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> BuildContext<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Copy everything the compiled plan references into
    /// `<build_context>/_build`
    pub fn stage(&self, definition: &Definition, options: &BuildOptions) -> Result<StagingReport> {
        let outputs = options.outputs_dir();
        let scripts = outputs.join("scripts");
        self.fs
            .create_dir_all(&scripts)
            .context(format!("Failed to create build context {:?}", outputs))?;

        let mut report = StagingReport::default();

        for kind in DependencyKind::ALL {
            if let Some(src) = definition.dependencies.path(kind) {
                let dest = outputs.join(context_file_name(kind));
                let written = self.copy(src, &dest)?;
                report.record(dest, written);
            }
        }

        if let Some(keyring) = &options.galaxy_keyring {
            let dest = outputs.join(DEFAULT_KEYRING_NAME);
            let written = self.copy(keyring, &dest)?;
            report.record(dest, written);
        }

        for file in &definition.additional_build_files {
            self.stage_additional_file(file, &definition.reference_dir, &outputs, &mut report)?;
        }

        if let Some(config) = &definition.ansible_config {
            let dest = outputs.join("ansible.cfg");
            let written = self.copy(config, &dest)?;
            report.record(dest, written);
        }

        for (name, content) in HELPER_SCRIPTS {
            let dest = scripts.join(name);
            let written = self.write_if_changed(&dest, content)?;
            self.fs.set_executable(&dest)?;
            report.record(dest, written);
        }

        debug!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            "Staged build context"
        );
        Ok(report)
    }

    fn stage_additional_file(
        &self,
        file: &AdditionalBuildFile,
        reference_dir: &Path,
        outputs: &Path,
        report: &mut StagingReport,
    ) -> Result<()> {
        let sources = if Path::new(&file.src).is_absolute() {
            let src = PathBuf::from(&file.src);
            if self.fs.is_file(&src) {
                vec![src]
            } else {
                Vec::new()
            }
        } else {
            self.fs.glob(reference_dir, &file.src)?
        };

        if sources.is_empty() {
            warn!("No files found for additional build file '{}', skipping", file.src);
            report.skipped.push(file.src.clone());
            return Ok(());
        }

        let dest_dir = outputs.join(&file.dest);
        self.fs
            .create_dir_all(&dest_dir)
            .context(format!("Failed to create directory {:?}", dest_dir))?;

        for src in sources {
            let Some(name) = src.file_name() else {
                continue;
            };
            let dest = dest_dir.join(name);
            let written = self.copy(&src, &dest)?;
            report.record(dest, written);
        }
        Ok(())
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<bool> {
        let written = self.fs.copy(src, dest)?;
        if written {
            debug!("Copied {:?} to {:?}", src, dest);
        }
        Ok(written)
    }

    fn write_if_changed(&self, dest: &Path, content: &str) -> Result<bool> {
        if self.fs.is_file(dest) && self.fs.read_to_string(dest)? == content {
            return Ok(false);
        }
        self.fs.write(dest, content.as_bytes())?;
        Ok(true)
    }

    /// Write the rendered plan to the build file path of `options`
    pub fn write_containerfile(&self, plan: &BuildPlan, options: &BuildOptions) -> Result<PathBuf> {
        let path = options.containerfile_path();
        self.fs
            .create_dir_all(&options.build_context)
            .context(format!("Failed to create build context {:?}", options.build_context))?;
        self.fs.write(&path, plan.render().as_bytes())?;

        info!("Wrote {}", path.display());
        Ok(path)
    }
}
