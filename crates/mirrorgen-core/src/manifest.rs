//! Package manifest synthesis.
//!
//! Every batch becomes one manifest named `<base>-<index>` that depends on
//! each entry id of the batch with the `*` range.

use std::{
    collections::{BTreeMap, HashSet},
    sync::LazyLock,
};

use mirrorgen_config::config::{Config, DEFAULT_DESCRIPTION, DEFAULT_LICENSE};
use mirrorgen_registry::RegistryEntry;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{batch::Batch, error::CoreError, CoreResult};

/// Range written for every dependency.
pub const WILDCARD_RANGE: &str = "*";

/// Leaves room for a `-<index>` suffix under the 214 character registry limit.
pub const MAX_BASE_NAME_LEN: usize = 200;

static BASE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[a-z0-9][a-z0-9._-]*/)?[a-z0-9][a-z0-9._-]*$")
        .expect("unable to compile package name regex")
});

/// Run-wide metadata shared by every generated manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTemplate {
    base_name: String,
    version: String,
    author: String,
    license: String,
    description: String,
    homepage: String,
    main: String,
}

impl ManifestTemplate {
    /// Validates the required fields and fills the rest with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] if:
    /// - `base_name` is empty, too long, or not a lowercase URL-safe package name
    /// - `version` is not a semantic version
    /// - `author` is blank
    pub fn new(
        base_name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
    ) -> CoreResult<Self> {
        let base_name = base_name.into();
        let version = version.into();
        let author = author.into();

        if base_name.is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "package name base can't be empty".into(),
            ));
        }
        if base_name.len() > MAX_BASE_NAME_LEN {
            return Err(CoreError::InvalidConfiguration(format!(
                "package name base is {} characters long, the limit is {}",
                base_name.len(),
                MAX_BASE_NAME_LEN
            )));
        }
        if !BASE_NAME_RE.is_match(&base_name) {
            return Err(CoreError::InvalidConfiguration(format!(
                "`{base_name}` is not a valid package name (use lowercase letters, digits, `-`, `.` and `_`)"
            )));
        }
        Version::parse(&version).map_err(|err| {
            CoreError::InvalidConfiguration(format!("`{version}` is not a valid version: {err}"))
        })?;
        if author.trim().is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "author can't be empty".into(),
            ));
        }

        Ok(Self {
            base_name,
            version,
            author,
            license: DEFAULT_LICENSE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            homepage: String::new(),
            main: String::new(),
        })
    }

    /// Builds a template taking the optional fields from a resolved config.
    pub fn from_config(
        config: &Config,
        base_name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
    ) -> CoreResult<Self> {
        Ok(Self::new(base_name, version, author)?
            .with_license(config.license())
            .with_description(config.description())
            .with_homepage(config.homepage())
            .with_main(config.main()))
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = homepage.into();
        self
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = main.into();
        self
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the package generated for batch `index`.
    pub fn package_name(&self, index: usize) -> String {
        format!("{}-{}", self.base_name, index)
    }
}

/// The `package.json` written for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub main: String,
    pub author: String,
    pub license: String,
    pub homepage: String,
    pub dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Pretty JSON with two-space indentation and a trailing newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// Builds the manifest for `batch`.
///
/// Duplicate ids collapse into a single dependency; see [`duplicate_ids`].
pub fn synthesize(batch: &Batch<RegistryEntry>, template: &ManifestTemplate) -> PackageManifest {
    let dependencies = batch
        .entries
        .iter()
        .map(|entry| (entry.id.clone(), WILDCARD_RANGE.to_string()))
        .collect();

    PackageManifest {
        name: template.package_name(batch.index),
        version: template.version.clone(),
        description: template.description.clone(),
        main: template.main.clone(),
        author: template.author.clone(),
        license: template.license.clone(),
        homepage: template.homepage.clone(),
        dependencies,
    }
}

/// Ids that occur more than once in `batch`, in first-repeat order.
pub fn duplicate_ids(batch: &Batch<RegistryEntry>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(batch.len());
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for entry in &batch.entries {
        if !seen.insert(entry.id.as_str()) && reported.insert(entry.id.as_str()) {
            duplicates.push(entry.id.clone());
        }
    }

    duplicates
}
