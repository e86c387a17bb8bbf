//! Closed, per-version schema records
//!
//! Each schema version is a separate set of `serde` records with
//! `deny_unknown_fields` on every mapping, so a typo anywhere in the
//! definition is rejected instead of silently ignored. The records are only
//! an intermediate shape: the validator converts them into the normalized
//! [`Definition`](super::Definition) and never hands them out.

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// Supported definition schema versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    pub fn from_number(version: i64) -> Option<Self> {
        match version {
            1 => Some(SchemaVersion::V1),
            2 => Some(SchemaVersion::V2),
            _ => None,
        }
    }

    pub fn as_number(&self) -> u8 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_number())
    }
}

/// Named injection point for user-supplied build steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepSection {
    PrependBase,
    AppendBase,
    PrependGalaxy,
    AppendGalaxy,
    PrependBuilder,
    AppendBuilder,
    PrependFinal,
    AppendFinal,
}

impl StepSection {
    pub const ALL: [StepSection; 8] = [
        StepSection::PrependBase,
        StepSection::AppendBase,
        StepSection::PrependGalaxy,
        StepSection::AppendGalaxy,
        StepSection::PrependBuilder,
        StepSection::AppendBuilder,
        StepSection::PrependFinal,
        StepSection::AppendFinal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepSection::PrependBase => "prepend_base",
            StepSection::AppendBase => "append_base",
            StepSection::PrependGalaxy => "prepend_galaxy",
            StepSection::AppendGalaxy => "append_galaxy",
            StepSection::PrependBuilder => "prepend_builder",
            StepSection::AppendBuilder => "append_builder",
            StepSection::PrependFinal => "prepend_final",
            StepSection::AppendFinal => "append_final",
        }
    }
}

impl fmt::Display for StepSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command or list of commands, as written in `additional_build_steps`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepCommands {
    Single(String),
    Many(Vec<String>),
}

impl StepCommands {
    /// A single string is stripped and split into lines; a list is kept
    /// verbatim.
    pub fn into_lines(self) -> Vec<String> {
        match self {
            StepCommands::Single(text) => text.trim().lines().map(str::to_string).collect(),
            StepCommands::Many(lines) => lines,
        }
    }
}

/// User build steps keyed by the normalized (version 2) section names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalBuildSteps {
    sections: BTreeMap<StepSection, Vec<String>>,
}

impl AdditionalBuildSteps {
    /// Steps for `section`, empty when none were given
    pub fn get(&self, section: StepSection) -> &[String] {
        self.sections
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }

    pub(crate) fn insert(&mut self, section: StepSection, commands: StepCommands) {
        self.sections.insert(section, commands.into_lines());
    }

    /// Fold version 1 `prepend`/`append` into `prepend_final`/`append_final`.
    ///
    /// A value already present under the version 2 key is kept, so applying
    /// the aliases more than once never changes the result.
    pub(crate) fn alias_legacy(&mut self, legacy: LegacySteps) {
        let aliases = [
            (legacy.prepend, StepSection::PrependFinal),
            (legacy.append, StepSection::AppendFinal),
        ];
        for (commands, section) in aliases {
            if let Some(commands) = commands {
                self.sections
                    .entry(section)
                    .or_insert_with(|| commands.into_lines());
            }
        }
    }
}

/// A key that is present must carry a value: `key: null` is rejected, only an
/// absent key reads as `None`.
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<T>::deserialize(deserializer)? {
        Some(value) => Ok(Some(value)),
        None => Err(D::Error::invalid_type(Unexpected::Other("null"), &"a value")),
    }
}

// ---------------------------------------------------------------------------
// Version 1
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DefinitionV1 {
    // Read by the version peek before this record is built.
    #[allow(dead_code)]
    pub version: Option<f64>,
    #[serde(default, deserialize_with = "non_null")]
    pub ansible_config: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub build_arg_defaults: Option<BuildArgsV1>,
    #[serde(default, deserialize_with = "non_null")]
    pub dependencies: Option<DependencyFiles>,
    #[serde(default, deserialize_with = "non_null")]
    pub additional_build_steps: Option<LegacySteps>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BuildArgsV1 {
    #[serde(rename = "EE_BASE_IMAGE", default, deserialize_with = "non_null")]
    pub ee_base_image: Option<String>,
    #[serde(rename = "EE_BUILDER_IMAGE", default, deserialize_with = "non_null")]
    pub ee_builder_image: Option<String>,
    #[serde(rename = "ANSIBLE_GALAXY_CLI_COLLECTION_OPTS", default, deserialize_with = "non_null")]
    pub galaxy_cli_collection_opts: Option<String>,
    #[serde(rename = "ANSIBLE_GALAXY_CLI_ROLE_OPTS", default, deserialize_with = "non_null")]
    pub galaxy_cli_role_opts: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DependencyFiles {
    #[serde(default, deserialize_with = "non_null")]
    pub python: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub galaxy: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LegacySteps {
    #[serde(default, deserialize_with = "non_null")]
    pub prepend: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub append: Option<StepCommands>,
}

// ---------------------------------------------------------------------------
// Version 2
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DefinitionV2 {
    #[allow(dead_code)]
    pub version: Option<f64>,
    #[serde(default, deserialize_with = "non_null")]
    pub ansible_config: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub build_arg_defaults: Option<BuildArgsV2>,
    #[serde(default, deserialize_with = "non_null")]
    pub dependencies: Option<DependenciesV2>,
    #[serde(default, deserialize_with = "non_null")]
    pub images: Option<ImagesV2>,
    #[serde(default, deserialize_with = "non_null")]
    pub additional_build_steps: Option<StepsV2>,
    #[serde(default, deserialize_with = "non_null")]
    pub additional_build_files: Option<Vec<BuildFileRecord>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BuildArgsV2 {
    #[serde(rename = "ANSIBLE_GALAXY_CLI_COLLECTION_OPTS", default, deserialize_with = "non_null")]
    pub galaxy_cli_collection_opts: Option<String>,
    #[serde(rename = "ANSIBLE_GALAXY_CLI_ROLE_OPTS", default, deserialize_with = "non_null")]
    pub galaxy_cli_role_opts: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DependenciesV2 {
    #[serde(default, deserialize_with = "non_null")]
    pub python: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub galaxy: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub system: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub python_interpreter: Option<PythonInterpreterRecord>,
    #[serde(default, deserialize_with = "non_null")]
    pub ansible_core: Option<PipPackageRecord>,
    #[serde(default, deserialize_with = "non_null")]
    pub ansible_runner: Option<PipPackageRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PythonInterpreterRecord {
    #[serde(default, deserialize_with = "non_null")]
    pub package_system: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub python_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PipPackageRecord {
    #[serde(default, deserialize_with = "non_null")]
    pub package_pip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ImagesV2 {
    #[serde(default, deserialize_with = "non_null")]
    pub base_image: Option<ImageRecord>,
    #[serde(default, deserialize_with = "non_null")]
    pub builder_image: Option<ImageRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ImageRecord {
    #[serde(default, deserialize_with = "non_null")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub signature_original_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StepsV2 {
    #[serde(default, deserialize_with = "non_null")]
    pub prepend_base: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub append_base: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub prepend_galaxy: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub append_galaxy: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub prepend_builder: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub append_builder: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub prepend_final: Option<StepCommands>,
    #[serde(default, deserialize_with = "non_null")]
    pub append_final: Option<StepCommands>,
}

impl From<StepsV2> for AdditionalBuildSteps {
    fn from(steps: StepsV2) -> Self {
        let mut normalized = AdditionalBuildSteps::default();
        let sections = [
            (StepSection::PrependBase, steps.prepend_base),
            (StepSection::AppendBase, steps.append_base),
            (StepSection::PrependGalaxy, steps.prepend_galaxy),
            (StepSection::AppendGalaxy, steps.append_galaxy),
            (StepSection::PrependBuilder, steps.prepend_builder),
            (StepSection::AppendBuilder, steps.append_builder),
            (StepSection::PrependFinal, steps.prepend_final),
            (StepSection::AppendFinal, steps.append_final),
        ];
        for (section, commands) in sections {
            if let Some(commands) = commands {
                normalized.insert(section, commands);
            }
        }
        normalized
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BuildFileRecord {
    pub src: String,
    pub dest: String,
}
