//! Throwaway contract project materialization.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};

/// One file of a contract project, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: PathBuf,
    pub content: String,
}

impl ProjectFile {
    fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Validate a project label and return it as a crate name.
///
/// Labels are lowercased ASCII alphanumerics plus `-` and `_`, starting with
/// a letter.
pub fn crate_name(label: &str) -> RunnerResult<String> {
    let name = label.trim().to_ascii_lowercase();
    let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(RunnerError::InvalidLabel(label.to_string()));
    }
    Ok(name)
}

fn dependency(version: &str) -> Value {
    let mut dep = Table::new();
    dep.insert("version".into(), Value::String(version.to_string()));
    Value::Table(dep)
}

fn package(name: &str) -> Value {
    let mut package = Table::new();
    package.insert("name".into(), Value::String(name.to_string()));
    package.insert("version".into(), Value::String("0.0.0".into()));
    package.insert(
        "authors".into(),
        Value::Array(vec![Value::String("Contract Forge".into())]),
    );
    package.insert("edition".into(), Value::String("2021".into()));
    package.insert("publish".into(), Value::Boolean(false));
    Value::Table(package)
}

fn contract_manifest(name: &str, sdk_version: &str) -> RunnerResult<String> {
    let mut lib = Table::new();
    lib.insert("path".into(), Value::String("src/lib.rs".into()));

    let mut deps = Table::new();
    deps.insert("multiversx-sc".into(), dependency(sdk_version));

    let mut dev_deps = Table::new();
    dev_deps.insert("multiversx-sc-scenario".into(), dependency(sdk_version));

    let mut workspace = Table::new();
    workspace.insert(
        "members".into(),
        Value::Array(vec![Value::String(".".into()), Value::String("meta".into())]),
    );

    let mut manifest = Table::new();
    manifest.insert("package".into(), package(name));
    manifest.insert("lib".into(), Value::Table(lib));
    manifest.insert("dependencies".into(), Value::Table(deps));
    manifest.insert("dev-dependencies".into(), Value::Table(dev_deps));
    manifest.insert("workspace".into(), Value::Table(workspace));

    Ok(toml::to_string(&manifest)?)
}

fn meta_manifest(name: &str, sdk_version: &str) -> RunnerResult<String> {
    let mut contract = Table::new();
    contract.insert("path".into(), Value::String("..".into()));

    let mut deps = Table::new();
    deps.insert("multiversx-sc-meta".into(), dependency(sdk_version));
    deps.insert(name.to_string(), Value::Table(contract));

    let mut manifest = Table::new();
    manifest.insert("package".into(), package(&format!("{}-meta", name)));
    manifest.insert("dependencies".into(), Value::Table(deps));

    Ok(toml::to_string(&manifest)?)
}

fn meta_main(name: &str) -> String {
    format!(
        "fn main() {{\n    multiversx_sc_meta::cli_main::<{}::AbiProvider>();\n}}\n",
        name.replace('-', "_")
    )
}

/// The full file set for compiling `source` as contract `label`.
pub fn project_files(source: &str, label: &str, sdk_version: &str) -> RunnerResult<Vec<ProjectFile>> {
    let name = crate_name(label)?;
    Ok(vec![
        ProjectFile::new("Cargo.toml", contract_manifest(&name, sdk_version)?),
        ProjectFile::new("src/lib.rs", source),
        ProjectFile::new("meta/Cargo.toml", meta_manifest(&name, sdk_version)?),
        ProjectFile::new("meta/src/main.rs", meta_main(&name)),
        ProjectFile::new("multiversx.json", "{\n    \"language\": \"rust\"\n}\n"),
    ])
}

/// A materialized project directory owned by one compile call.
#[derive(Debug)]
pub struct ContractProject {
    root: PathBuf,
    name: String,
    id: String,
}

impl ContractProject {
    /// Write a fresh, uniquely named project under `work_root`.
    pub async fn create(
        work_root: &Path,
        source: &str,
        label: &str,
        sdk_version: &str,
    ) -> RunnerResult<Self> {
        let name = crate_name(label)?;
        let files = project_files(source, &name, sdk_version)?;
        let id = format!("{}-{}", name, uuid::Uuid::new_v4());
        let root = work_root.join(&id);

        for file in &files {
            let path = root.join(&file.path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &file.content).await?;
        }

        debug!("Created contract project at {}", root.display());
        Ok(Self { root, name, id })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique directory name, `<name>-<uuid>`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn wasm_path(&self, output_dir: &str) -> PathBuf {
        self.root.join(output_dir).join(format!("{}.wasm", self.name))
    }

    pub fn abi_path(&self, output_dir: &str) -> PathBuf {
        self.root
            .join(output_dir)
            .join(format!("{}.abi.json", self.name))
    }

    /// Delete the project directory. Failures are logged, not returned.
    pub async fn remove(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            warn!("Failed to remove {}: {}", self.root.display(), e);
        }
    }
}
