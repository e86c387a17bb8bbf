//! Compiles a [`Definition`] into a four stage [`BuildPlan`]

use super::constants::{
    context_file_name, ANSIBLE_CONTENT_PATH, BUILDER_PYTHON_TOOLS, BUILD_WORKDIR,
    EXECUTION_ENVIRONMENT_LABEL, OUTPUT_DIR, USER_CONTENT_SUBFOLDER,
};
use super::galaxy::{collection_install_step, role_install_step};
use super::options::BuildOptions;
use super::plan::{BuildPlan, Stage, StageKind};
use crate::definition::{Definition, DependencyKind, SchemaVersion, StepSection};
use tracing::debug;

/// A build argument with a non-empty value
#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildArg {
    name: &'static str,
    value: String,
}

/// Build arguments in declaration order; empty or absent values are left out
fn build_args(definition: &Definition) -> Vec<BuildArg> {
    let defaults = &definition.build_arg_defaults;
    let deps = &definition.dependencies;

    let candidates: [(&'static str, Option<&str>); 7] = [
        ("EE_BASE_IMAGE", Some(defaults.ee_base_image.as_str())),
        ("EE_BUILDER_IMAGE", defaults.ee_builder_image.as_deref()),
        ("PYCMD", Some(definition.python_path())),
        ("PYPKG", deps.python_package_name.as_deref()),
        (
            "ANSIBLE_GALAXY_CLI_COLLECTION_OPTS",
            defaults.galaxy_cli_collection_opts.as_deref(),
        ),
        (
            "ANSIBLE_GALAXY_CLI_ROLE_OPTS",
            defaults.galaxy_cli_role_opts.as_deref(),
        ),
        ("ANSIBLE_INSTALL_REFS", deps.ansible_install_refs.as_deref()),
    ];

    candidates
        .into_iter()
        .filter_map(|(name, value)| match value {
            Some(value) if !value.is_empty() => Some(BuildArg {
                name,
                value: value.to_string(),
            }),
            _ => None,
        })
        .collect()
}

/// Compile `definition` into a build plan.
///
/// Pure and deterministic: the same definition and options always produce
/// the same plan. Nothing is read from or written to disk.
pub fn compile(definition: &Definition, options: &BuildOptions) -> BuildPlan {
    let args = build_args(definition);
    let compiler = StageCompiler {
        definition,
        options,
        args: &args,
    };

    let global_args = args
        .iter()
        .map(|arg| format!("ARG {}=\"{}\"", arg.name, arg.value))
        .collect();

    let plan = BuildPlan::new(
        global_args,
        [
            compiler.base(),
            compiler.galaxy(),
            compiler.builder(),
            compiler.final_stage(),
        ],
    );
    debug!(
        "Compiled {} line build plan for schema version {}",
        plan.lines().len(),
        definition.version
    );
    plan
}

struct StageCompiler<'a> {
    definition: &'a Definition,
    options: &'a BuildOptions,
    args: &'a [BuildArg],
}

impl StageCompiler<'_> {
    fn has_galaxy(&self) -> bool {
        self.definition
            .dependencies
            .path(DependencyKind::Galaxy)
            .is_some()
    }

    fn has_requirements(&self) -> bool {
        self.definition.dependencies.has_requirements()
    }

    /// Comment and `FROM` lines, then the stage-scoped argument redeclarations
    fn open(&self, kind: StageKind, header: &[&str]) -> Stage {
        let mut stage = Stage::new(kind);
        stage.push(kind.comment());
        stage.extend(header.iter().copied());
        stage.extend(self.args.iter().map(|arg| format!("ARG {}", arg.name)));
        stage.push("");
        stage
    }

    fn steps(&self, stage: &mut Stage, section: StepSection) {
        stage.extend(self.definition.steps(section).iter().map(String::as_str));
    }

    fn galaxy_copy(&self, stage: &mut Stage) {
        if self.has_galaxy() {
            stage.push("");
            stage.push(format!(
                "COPY --from={} {} {}",
                StageKind::Galaxy.alias(),
                ANSIBLE_CONTENT_PATH,
                ANSIBLE_CONTENT_PATH
            ));
            stage.push("");
        }
    }

    fn base(&self) -> Stage {
        let mut stage = self.open(StageKind::Base, &["FROM $EE_BASE_IMAGE as base"]);
        self.steps(&mut stage, StepSection::PrependBase);

        // A dedicated builder image brings its own interpreter
        if !self.definition.has_builder_image() {
            let deps = &self.definition.dependencies;
            if deps.python_package_name.as_deref().is_some_and(|p| !p.is_empty()) {
                stage.push("RUN dnf install $PYPKG -y && dnf clean all");
            }
            if deps.ansible_install_refs.as_deref().is_some_and(|r| !r.is_empty()) {
                stage.push(
                    "RUN $PYCMD -m ensurepip && $PYCMD -m pip install --no-cache-dir $ANSIBLE_INSTALL_REFS",
                );
            }
        }

        stage.push(format!(
            "COPY {}/scripts/ {}/scripts/",
            USER_CONTENT_SUBFOLDER, OUTPUT_DIR
        ));
        self.steps(&mut stage, StepSection::AppendBase);
        stage
    }

    fn galaxy(&self) -> Stage {
        let mut stage = self.open(StageKind::Galaxy, &["FROM base as galaxy", "USER root"]);
        self.steps(&mut stage, StepSection::PrependGalaxy);

        if self.definition.version == SchemaVersion::V1 && self.definition.ansible_config.is_some() {
            stage.push(format!(
                "ADD {}/ansible.cfg ~/.ansible.cfg",
                USER_CONTENT_SUBFOLDER
            ));
            stage.push("");
        }

        if self.has_requirements() {
            stage.push(format!("ADD {} {}", USER_CONTENT_SUBFOLDER, BUILD_WORKDIR));
            stage.push(format!("WORKDIR {}", BUILD_WORKDIR));
            stage.push("");
        }

        if self.has_galaxy() {
            stage.push(role_install_step());
            stage.push(collection_install_step(self.options));
        }

        self.steps(&mut stage, StepSection::AppendGalaxy);
        stage
    }

    fn builder(&self) -> Stage {
        let from = if self.definition.has_builder_image() {
            "FROM $EE_BUILDER_IMAGE as builder"
        } else {
            "FROM base as builder"
        };
        let mut stage = self.open(StageKind::Builder, &[from]);

        if !self.definition.has_builder_image() {
            stage.push(format!(
                "RUN $PYCMD -m pip install --no-cache-dir {}",
                BUILDER_PYTHON_TOOLS
            ));
        }

        self.steps(&mut stage, StepSection::PrependBuilder);
        self.galaxy_copy(&mut stage);

        if self.has_requirements() {
            let deps = &self.definition.dependencies;
            let mut introspect = format!("RUN $PYCMD {}/scripts/introspect.py introspect --sanitize", OUTPUT_DIR);

            for (kind, flag) in [
                (DependencyKind::Python, "--user-pip"),
                (DependencyKind::System, "--user-bindep"),
            ] {
                if deps.path(kind).is_some() {
                    let name = context_file_name(kind);
                    stage.push(format!("ADD {}/{} {}", USER_CONTENT_SUBFOLDER, name, name));
                    introspect.push_str(&format!(" {}={}", flag, name));
                }
            }

            introspect.push_str(" --write-bindep=/tmp/src/bindep.txt --write-pip=/tmp/src/requirements.txt");
            stage.push(introspect);
            stage.push(format!("RUN {}/scripts/assemble", OUTPUT_DIR));
        }

        self.steps(&mut stage, StepSection::AppendBuilder);
        stage
    }

    fn final_stage(&self) -> Stage {
        let mut stage = self.open(StageKind::Final, &["FROM base", "USER root"]);
        self.steps(&mut stage, StepSection::PrependFinal);
        self.galaxy_copy(&mut stage);

        if self.has_requirements() {
            stage.push(format!(
                "COPY --from={} {}/ {}/",
                StageKind::Builder.alias(),
                OUTPUT_DIR,
                OUTPUT_DIR
            ));
            stage.push(format!(
                "RUN {}/scripts/install-from-bindep && rm -rf {}/wheels",
                OUTPUT_DIR, OUTPUT_DIR
            ));
        }

        self.steps(&mut stage, StepSection::AppendFinal);
        stage.push(EXECUTION_ENVIRONMENT_LABEL);
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{parse_definition, validate};
    use crate::fs::MockFileSystem;
    use std::path::Path;

    fn definition(yaml: &str, fs: &MockFileSystem) -> Definition {
        let raw = parse_definition(yaml).unwrap();
        validate(&raw, Path::new("/mock"), fs).unwrap()
    }

    fn fs_with_requirements() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("requirements.txt", "requests\n");
        fs.add_file("requirements.yml", "collections: []\n");
        fs.add_file("bindep.txt", "git\n");
        fs.add_file("ansible.cfg", "[defaults]\n");
        fs
    }

    fn position(stage: &Stage, line: &str) -> usize {
        stage
            .steps()
            .iter()
            .position(|step| step == line)
            .unwrap_or_else(|| panic!("missing line {:?} in {:?}", line, stage.steps()))
    }

    #[test]
    fn test_minimal_v1_plan() {
        let fs = MockFileSystem::new();
        let plan = compile(&definition("version: 1", &fs), &BuildOptions::default());

        assert_eq!(
            plan.global_args(),
            &[
                "ARG EE_BASE_IMAGE=\"quay.io/ansible/ansible-runner:latest\"".to_string(),
                "ARG EE_BUILDER_IMAGE=\"quay.io/ansible/ansible-builder:latest\"".to_string(),
                "ARG PYCMD=\"/usr/bin/python3\"".to_string(),
            ]
        );

        let builder = plan.stage(StageKind::Builder);
        assert_eq!(builder.steps()[1], "FROM $EE_BUILDER_IMAGE as builder");
        assert!(!builder.steps().iter().any(|s| s.contains("introspect")));

        let last = plan.lines().last().copied();
        assert_eq!(last, Some("LABEL ansible-execution-environment=true"));
        assert!(!plan.render().contains("COPY --from=builder"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let fs = fs_with_requirements();
        let def = definition(
            "version: 2\ndependencies:\n  python: requirements.txt\n  galaxy: requirements.yml\n",
            &fs,
        );
        let options = BuildOptions::default();
        assert_eq!(compile(&def, &options).render(), compile(&def, &options).render());
    }

    #[test]
    fn test_stage_order_and_headers() {
        let fs = MockFileSystem::new();
        let plan = compile(&definition("version: 2", &fs), &BuildOptions::default());

        let headers: Vec<(&str, &str)> = plan
            .stages()
            .iter()
            .map(|stage| (stage.steps()[0].as_str(), stage.steps()[1].as_str()))
            .collect();
        assert_eq!(
            headers,
            vec![
                ("# Base build stage", "FROM $EE_BASE_IMAGE as base"),
                ("# Galaxy build stage", "FROM base as galaxy"),
                ("# Builder build stage", "FROM base as builder"),
                ("# Final build stage", "FROM base"),
            ]
        );
    }

    #[test]
    fn test_stage_args_redeclared_without_values() {
        let fs = MockFileSystem::new();
        let def = definition(
            "version: 2\nbuild_arg_defaults:\n  ANSIBLE_GALAXY_CLI_COLLECTION_OPTS: '--pre'\n",
            &fs,
        );
        let plan = compile(&def, &BuildOptions::default());

        assert!(plan
            .global_args()
            .contains(&"ARG ANSIBLE_GALAXY_CLI_COLLECTION_OPTS=\"--pre\"".to_string()));
        for stage in plan.stages() {
            assert!(stage
                .steps()
                .contains(&"ARG ANSIBLE_GALAXY_CLI_COLLECTION_OPTS".to_string()));
            assert!(!stage.steps().contains(&"ARG ANSIBLE_GALAXY_CLI_ROLE_OPTS".to_string()));
        }
    }

    #[test]
    fn test_empty_values_are_omitted() {
        let fs = MockFileSystem::new();
        let def = definition(
            "version: 2\nbuild_arg_defaults:\n  ANSIBLE_GALAXY_CLI_ROLE_OPTS: ''\n",
            &fs,
        );
        let text = compile(&def, &BuildOptions::default()).render();
        assert!(!text.contains("ARG ANSIBLE_GALAXY_CLI_ROLE_OPTS"));
        assert!(!text.contains("ARG EE_BUILDER_IMAGE"));
    }

    #[test]
    fn test_keyring_flags_collection_install() {
        let fs = fs_with_requirements();
        let def = definition("version: 1\ndependencies:\n  galaxy: requirements.yml\n", &fs);

        let plain = compile(&def, &BuildOptions::default()).render();
        assert!(plain.contains("RUN ANSIBLE_GALAXY_DISABLE_GPG_VERIFY=1 ansible-galaxy collection install"));
        assert!(!plain.contains("--keyring"));

        let signed = compile(&def, &BuildOptions::default().with_keyring("/tmp/k.gpg")).render();
        assert!(signed.contains("--keyring \"keyring.gpg\""));
        assert!(!signed.contains("ANSIBLE_GALAXY_DISABLE_GPG_VERIFY"));
    }

    #[test]
    fn test_v2_galaxy_with_dynamic_builder() {
        let fs = fs_with_requirements();
        let def = definition(
            "version: 2\nimages:\n  base_image:\n    name: quay.io/ee:1\ndependencies:\n  galaxy: requirements.yml\n",
            &fs,
        );
        let plan = compile(&def, &BuildOptions::default());

        let galaxy = plan.stage(StageKind::Galaxy);
        let add = position(galaxy, "ADD _build /build");
        let roles = position(galaxy, &role_install_step());
        let collections = roles + 1;
        assert!(add < roles);
        assert!(galaxy.steps()[collections].contains("ansible-galaxy collection install"));

        let builder = plan.stage(StageKind::Builder);
        assert_eq!(builder.steps()[1], "FROM base as builder");
        let pip = position(
            builder,
            "RUN $PYCMD -m pip install --no-cache-dir bindep pyyaml requirements-parser",
        );
        let copy = position(builder, "COPY --from=galaxy /usr/share/ansible /usr/share/ansible");
        let introspect = builder
            .steps()
            .iter()
            .position(|s| s.starts_with("RUN $PYCMD /output/scripts/introspect.py"))
            .unwrap();
        assert!(pip < copy && copy < introspect);

        let final_stage = plan.stage(StageKind::Final);
        position(final_stage, "COPY --from=galaxy /usr/share/ansible /usr/share/ansible");
        position(final_stage, "COPY --from=builder /output/ /output/");
        position(final_stage, "RUN /output/scripts/install-from-bindep && rm -rf /output/wheels");
    }

    #[test]
    fn test_introspect_uses_declared_files() {
        let fs = fs_with_requirements();
        let def = definition(
            "version: 1\ndependencies:\n  python: requirements.txt\n  system: bindep.txt\n",
            &fs,
        );
        let plan = compile(&def, &BuildOptions::default());
        let builder = plan.stage(StageKind::Builder);

        let python = position(builder, "ADD _build/requirements.txt requirements.txt");
        let system = position(builder, "ADD _build/bindep.txt bindep.txt");
        let introspect = position(
            builder,
            "RUN $PYCMD /output/scripts/introspect.py introspect --sanitize \
             --user-pip=requirements.txt --user-bindep=bindep.txt \
             --write-bindep=/tmp/src/bindep.txt --write-pip=/tmp/src/requirements.txt",
        );
        let assemble = position(builder, "RUN /output/scripts/assemble");
        assert!(python < system && system < introspect && introspect < assemble);
        assert!(!plan.render().contains("ansible-galaxy"));
    }

    #[test]
    fn test_prepend_galaxy_precedes_generated_steps() {
        let fs = fs_with_requirements();
        let def = definition(
            "version: 2\ndependencies:\n  galaxy: requirements.yml\nadditional_build_steps:\n  prepend_galaxy:\n    - RUN echo before\n  append_galaxy: RUN echo after\n",
            &fs,
        );
        let plan = compile(&def, &BuildOptions::default());
        let galaxy = plan.stage(StageKind::Galaxy);

        let before = position(galaxy, "RUN echo before");
        let add = position(galaxy, "ADD _build /build");
        let after = position(galaxy, "RUN echo after");
        assert!(before < add);
        assert_eq!(after, galaxy.steps().len() - 1);
    }

    #[test]
    fn test_legacy_steps_land_in_final_stage() {
        let fs = MockFileSystem::new();
        let def = definition(
            "version: 1\nadditional_build_steps:\n  prepend: |\n    RUN one\n    RUN two\n  append:\n    - RUN three\n",
            &fs,
        );
        let plan = compile(&def, &BuildOptions::default());
        let final_stage = plan.stage(StageKind::Final);

        let one = position(final_stage, "RUN one");
        assert_eq!(final_stage.steps()[one + 1], "RUN two");
        let three = position(final_stage, "RUN three");
        assert_eq!(final_stage.steps()[three + 1], EXECUTION_ENVIRONMENT_LABEL);
    }

    #[test]
    fn test_v1_ansible_config_added_to_galaxy_stage() {
        let fs = fs_with_requirements();
        let def = definition("version: 1\nansible_config: ansible.cfg\n", &fs);
        let plan = compile(&def, &BuildOptions::default());
        position(plan.stage(StageKind::Galaxy), "ADD _build/ansible.cfg ~/.ansible.cfg");
    }

    #[test]
    fn test_python_bootstrap_only_without_builder_image() {
        let fs = MockFileSystem::new();
        let yaml = "version: 2\ndependencies:\n  python_interpreter:\n    package_system: python39\n    python_path: /usr/bin/python3.9\n  ansible_core:\n    package_pip: ansible-core==2.14\n  ansible_runner:\n    package_pip: ansible-runner\n";
        let plan = compile(&definition(yaml, &fs), &BuildOptions::default());

        assert!(plan
            .global_args()
            .contains(&"ARG ANSIBLE_INSTALL_REFS=\"ansible-core==2.14 ansible-runner\"".to_string()));
        assert!(plan.global_args().contains(&"ARG PYCMD=\"/usr/bin/python3.9\"".to_string()));
        let base = plan.stage(StageKind::Base);
        let pypkg = position(base, "RUN dnf install $PYPKG -y && dnf clean all");
        let refs = position(
            base,
            "RUN $PYCMD -m ensurepip && $PYCMD -m pip install --no-cache-dir $ANSIBLE_INSTALL_REFS",
        );
        let scripts = position(base, "COPY _build/scripts/ /output/scripts/");
        assert!(pypkg < refs && refs < scripts);

        let with_builder = format!("{}images:\n  builder_image:\n    name: quay.io/builder:1\n", yaml);
        let plan = compile(&definition(&with_builder, &fs), &BuildOptions::default());
        assert!(!plan.render().contains("ensurepip"));
        assert!(!plan.render().contains("dnf install"));
    }
}
