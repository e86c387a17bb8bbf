//! Fixed names and paths shared by the compiler and the build context

use crate::definition::DependencyKind;

/// Subfolder of the build context holding every staged file
pub const USER_CONTENT_SUBFOLDER: &str = "_build";

/// Default build context directory
pub const DEFAULT_BUILD_CONTEXT: &str = "context";

/// Name the galaxy keyring is staged under
pub const DEFAULT_KEYRING_NAME: &str = "keyring.gpg";

pub const BASE_COLLECTIONS_PATH: &str = "/usr/share/ansible/collections";
pub const BASE_ROLES_PATH: &str = "/usr/share/ansible/roles";

/// Common parent of the collections and roles trees, copied between stages
pub const ANSIBLE_CONTENT_PATH: &str = "/usr/share/ansible";

/// Working directory the build context is added to during the galaxy stage
pub const BUILD_WORKDIR: &str = "/build";

/// Where helper scripts and assembled artifacts live inside the images
pub const OUTPUT_DIR: &str = "/output";

/// Python tools a dynamic builder needs before it can introspect
pub const BUILDER_PYTHON_TOOLS: &str = "bindep pyyaml requirements-parser";

pub const EXECUTION_ENVIRONMENT_LABEL: &str = "LABEL ansible-execution-environment=true";

/// Environment variable disabling GPG verification for `ansible-galaxy`
pub const GALAXY_DISABLE_GPG_VERIFY: &str = "ANSIBLE_GALAXY_DISABLE_GPG_VERIFY=1";

/// File name a dependency file is staged under in the build context
pub fn context_file_name(kind: DependencyKind) -> &'static str {
    match kind {
        DependencyKind::Python => "requirements.txt",
        DependencyKind::Galaxy => "requirements.yml",
        DependencyKind::System => "bindep.txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_path_is_parent_of_galaxy_trees() {
        assert!(BASE_COLLECTIONS_PATH.starts_with(ANSIBLE_CONTENT_PATH));
        assert!(BASE_ROLES_PATH.starts_with(ANSIBLE_CONTENT_PATH));
    }

    #[test]
    fn test_context_file_names_distinct() {
        let names: Vec<&str> = DependencyKind::ALL
            .iter()
            .map(|kind| context_file_name(*kind))
            .collect();
        assert_eq!(names, vec!["requirements.txt", "requirements.yml", "bindep.txt"]);
    }
}
