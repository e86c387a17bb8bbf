//! `ansible-galaxy` install commands and signature verification arguments

use super::constants::{
    context_file_name, BASE_COLLECTIONS_PATH, BASE_ROLES_PATH, DEFAULT_KEYRING_NAME,
    GALAXY_DISABLE_GPG_VERIFY,
};
use super::options::BuildOptions;
use crate::definition::DependencyKind;
use std::fmt;

/// An optional trailing argument of `ansible-galaxy collection install`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionInstallArg {
    IgnoreSignatureStatusCode(String),
    RequiredValidSignatureCount(String),
    Keyring(String),
}

impl fmt::Display for CollectionInstallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionInstallArg::IgnoreSignatureStatusCode(code) => {
                write!(f, "--ignore-signature-status-code {}", code)
            }
            CollectionInstallArg::RequiredValidSignatureCount(count) => {
                write!(f, "--required-valid-signature-count {}", count)
            }
            CollectionInstallArg::Keyring(name) => write!(f, "--keyring \"{}\"", name),
        }
    }
}

type ArgBuilder = fn(&BuildOptions) -> Vec<CollectionInstallArg>;

/// Applied in this order; each contributes zero or more arguments
const COLLECTION_ARG_BUILDERS: [ArgBuilder; 3] = [
    ignore_signature_status_codes,
    required_valid_signature_count,
    keyring,
];

fn ignore_signature_status_codes(options: &BuildOptions) -> Vec<CollectionInstallArg> {
    options
        .galaxy_ignore_signature_status_codes
        .iter()
        .cloned()
        .map(CollectionInstallArg::IgnoreSignatureStatusCode)
        .collect()
}

fn required_valid_signature_count(options: &BuildOptions) -> Vec<CollectionInstallArg> {
    options
        .galaxy_required_valid_signature_count
        .iter()
        .cloned()
        .map(CollectionInstallArg::RequiredValidSignatureCount)
        .collect()
}

fn keyring(options: &BuildOptions) -> Vec<CollectionInstallArg> {
    match options.galaxy_keyring {
        Some(_) => vec![CollectionInstallArg::Keyring(DEFAULT_KEYRING_NAME.to_string())],
        None => Vec::new(),
    }
}

/// Trailing arguments of the collection install command
pub fn collection_install_args(options: &BuildOptions) -> Vec<CollectionInstallArg> {
    COLLECTION_ARG_BUILDERS
        .iter()
        .flat_map(|builder| builder(options))
        .collect()
}

/// Environment prefix for the collection install command; without a keyring
/// signature verification is switched off
pub fn collection_install_env(options: &BuildOptions) -> Option<&'static str> {
    match options.galaxy_keyring {
        Some(_) => None,
        None => Some(GALAXY_DISABLE_GPG_VERIFY),
    }
}

pub(crate) fn role_install_step() -> String {
    format!(
        "RUN ansible-galaxy role install $ANSIBLE_GALAXY_CLI_ROLE_OPTS -r {} --roles-path \"{}\"",
        context_file_name(DependencyKind::Galaxy),
        BASE_ROLES_PATH
    )
}

pub(crate) fn collection_install_step(options: &BuildOptions) -> String {
    let mut step = String::from("RUN ");
    if let Some(env) = collection_install_env(options) {
        step.push_str(env);
        step.push(' ');
    }
    step.push_str(&format!(
        "ansible-galaxy collection install $ANSIBLE_GALAXY_CLI_COLLECTION_OPTS -r {} --collections-path \"{}\"",
        context_file_name(DependencyKind::Galaxy),
        BASE_COLLECTIONS_PATH
    ));

    for arg in collection_install_args(options) {
        step.push(' ');
        step.push_str(&arg.to_string());
    }
    step
}
