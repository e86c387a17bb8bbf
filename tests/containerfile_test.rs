//! Build plan compilation and build context staging against a real
//! directory tree

use ee_builder::containerfile::{compile, BuildContext, BuildOptions, ContainerRuntime, StageKind};
use ee_builder::definition::load_definition;
use ee_builder::fs::RealFileSystem;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FULL_DEFINITION: &str = r#"
version: 2
images:
  base_image:
    name: quay.io/org/runner:2
dependencies:
  python: requirements.txt
  galaxy: requirements.yml
  system: bindep.txt
additional_build_steps:
  prepend_final: RUN echo hello
"#;

const FULL_CONTAINERFILE: &str = r#"ARG EE_BASE_IMAGE="quay.io/org/runner:2"
ARG PYCMD="/usr/bin/python3"

# Base build stage
FROM $EE_BASE_IMAGE as base
ARG EE_BASE_IMAGE
ARG PYCMD

COPY _build/scripts/ /output/scripts/

# Galaxy build stage
FROM base as galaxy
USER root
ARG EE_BASE_IMAGE
ARG PYCMD

ADD _build /build
WORKDIR /build

RUN ansible-galaxy role install $ANSIBLE_GALAXY_CLI_ROLE_OPTS -r requirements.yml --roles-path "/usr/share/ansible/roles"
RUN ANSIBLE_GALAXY_DISABLE_GPG_VERIFY=1 ansible-galaxy collection install $ANSIBLE_GALAXY_CLI_COLLECTION_OPTS -r requirements.yml --collections-path "/usr/share/ansible/collections"

# Builder build stage
FROM base as builder
ARG EE_BASE_IMAGE
ARG PYCMD

RUN $PYCMD -m pip install --no-cache-dir bindep pyyaml requirements-parser

COPY --from=galaxy /usr/share/ansible /usr/share/ansible

ADD _build/requirements.txt requirements.txt
ADD _build/bindep.txt bindep.txt
RUN $PYCMD /output/scripts/introspect.py introspect --sanitize --user-pip=requirements.txt --user-bindep=bindep.txt --write-bindep=/tmp/src/bindep.txt --write-pip=/tmp/src/requirements.txt
RUN /output/scripts/assemble

# Final build stage
FROM base
USER root
ARG EE_BASE_IMAGE
ARG PYCMD

RUN echo hello

COPY --from=galaxy /usr/share/ansible /usr/share/ansible

COPY --from=builder /output/ /output/
RUN /output/scripts/install-from-bindep && rm -rf /output/wheels
LABEL ansible-execution-environment=true
"#;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, content).expect("Failed to write file");
}

fn full_project(dir: &TempDir) {
    write(dir.path(), "execution-environment.yml", FULL_DEFINITION);
    write(dir.path(), "requirements.txt", "requests\n");
    write(dir.path(), "requirements.yml", "collections:\n  - community.general\n");
    write(dir.path(), "bindep.txt", "git [platform:rpm]\n");
}

#[test]
fn test_full_containerfile_text() {
    let dir = TempDir::new().unwrap();
    full_project(&dir);
    let fs = RealFileSystem;

    let definition =
        load_definition(&dir.path().join("execution-environment.yml"), &fs).unwrap();
    let options = BuildOptions::new(dir.path().join("context"));
    let plan = compile(&definition, &options);

    let context = BuildContext::new(&fs);
    context.stage(&definition, &options).unwrap();
    let path = context.write_containerfile(&plan, &options).unwrap();

    assert_eq!(path, dir.path().join("context/Containerfile"));
    assert_eq!(fs::read_to_string(&path).unwrap(), FULL_CONTAINERFILE);
}

#[test]
fn test_staged_context_layout() {
    let dir = TempDir::new().unwrap();
    full_project(&dir);
    write(dir.path(), "files/one.cfg", "1");
    write(dir.path(), "files/two.cfg", "2");
    let extra = "additional_build_files:\n  - src: files/*.cfg\n    dest: configs\n";
    write(
        dir.path(),
        "execution-environment.yml",
        &format!("{}{}", FULL_DEFINITION, extra),
    );
    write(dir.path(), "keyring.pub", "KEY");

    let fs = RealFileSystem;
    let definition =
        load_definition(&dir.path().join("execution-environment.yml"), &fs).unwrap();
    let options = BuildOptions::new(dir.path().join("context"))
        .with_runtime(ContainerRuntime::Docker)
        .with_keyring(dir.path().join("keyring.pub"));

    let report = BuildContext::new(&fs).stage(&definition, &options).unwrap();
    assert!(report.skipped.is_empty());

    let build = dir.path().join("context/_build");
    for name in [
        "requirements.txt",
        "requirements.yml",
        "bindep.txt",
        "keyring.gpg",
        "configs/one.cfg",
        "configs/two.cfg",
        "scripts/assemble",
        "scripts/get-extras-packages",
        "scripts/install-from-bindep",
        "scripts/introspect.py",
    ] {
        assert!(build.join(name).is_file(), "missing {}", name);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(build.join("scripts/assemble"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    let plan = compile(&definition, &options);
    let text = plan.render();
    assert!(text.contains("--keyring \"keyring.gpg\""));
    assert_eq!(options.containerfile_path(), dir.path().join("context/Dockerfile"));
}

#[test]
fn test_restaging_keeps_unchanged_files() {
    let dir = TempDir::new().unwrap();
    full_project(&dir);
    let fs = RealFileSystem;
    let definition =
        load_definition(&dir.path().join("execution-environment.yml"), &fs).unwrap();
    let options = BuildOptions::new(dir.path().join("context"));
    let context = BuildContext::new(&fs);

    let first = context.stage(&definition, &options).unwrap();
    assert_eq!(first.written.len(), 7);

    let second = context.stage(&definition, &options).unwrap();
    assert!(second.written.is_empty());
    assert_eq!(second.unchanged.len(), 7);
}

#[test]
fn test_no_dependencies_scenario() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "ee.yml",
        "version: 2\nimages:\n  base_image:\n    name: x/y:latest\n",
    );
    let fs = RealFileSystem;
    let definition = load_definition(&dir.path().join("ee.yml"), &fs).unwrap();
    let plan = compile(&definition, &BuildOptions::default());

    assert_eq!(plan.global_args()[0], "ARG EE_BASE_IMAGE=\"x/y:latest\"");
    assert_eq!(plan.stage(StageKind::Base).steps()[1], "FROM $EE_BASE_IMAGE as base");
    for kind in [StageKind::Builder, StageKind::Final] {
        let steps = plan.stage(kind).steps().join("\n");
        assert!(!steps.contains("introspect"));
        assert!(!steps.contains("assemble"));
        assert!(!steps.contains("install-from-bindep"));
    }
}
