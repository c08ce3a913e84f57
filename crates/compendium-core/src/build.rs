//! Full build: one compendium per group, then the aggregate

use crate::assemble::strip_auxiliary;
use crate::error::{Error, Result};
use crate::merger::{merge_documents, merge_files, Compendium, MergeStrategy};
use crate::options::{compendium_file_name, BuildConfig};
use crate::report::RunReport;
use crate::scanner::{scan_content, ScanResult};
use std::fs;

/// Scan the content root and build every included compendium
pub fn build_compendiums(config: &BuildConfig) -> Result<RunReport> {
    let scan = scan_content(
        &config.content_root,
        &config.includes,
        std::slice::from_ref(&config.output_dir),
    )?;
    build_from_scan(config, &scan)
}

/// Build compendiums for an existing scan
pub fn build_from_scan(config: &BuildConfig, scan: &ScanResult) -> Result<RunReport> {
    fs::create_dir_all(&config.output_dir)?;

    let aggregate_name = config.aggregate_name();
    let mut report = RunReport::new(aggregate_name);
    let mut group_documents = Vec::new();

    for group in &scan.groups {
        tracing::info!(group = %group.name, files = group.members.len(), "merging group");

        let compendium = match merge_files(
            &group.name,
            &group.members,
            MergeStrategy::Templated,
            &config.merge,
        ) {
            Ok(compendium) => compendium,
            Err(e) if config.skip_invalid => {
                tracing::warn!(group = %group.name, error = %e, "skipping group");
                report.record_failure(&group.name, &e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let path = config.output_dir.join(compendium_file_name(&group.name));
        compendium.write(&path)?;
        report.record(&compendium, &path);
        group_documents.push(compendium.into_document(path));
    }

    if group_documents.is_empty() {
        return Err(Error::NoSources(aggregate_name.to_string()));
    }

    let mut aggregate = merge_documents(
        aggregate_name,
        group_documents,
        MergeStrategy::Templated,
        &config.merge,
    )?;
    let stripped = strip_auxiliary(&mut aggregate.root);
    tracing::debug!(compendium = aggregate_name, stripped, "dropped auxiliary entries");
    let path = config.output_dir.join(compendium_file_name(aggregate_name));
    aggregate.write(&path)?;
    report.record(&aggregate, &path);

    tracing::info!(
        compendium = aggregate_name,
        entries = aggregate.entry_count(),
        path = %path.display(),
        "wrote aggregate"
    );

    Ok(report)
}

/// Merge and write a single named group
pub fn build_group(config: &BuildConfig, scan: &ScanResult, name: &str) -> Result<Compendium> {
    let group = scan
        .find_group(name)
        .ok_or_else(|| Error::GroupNotFound(name.to_string()))?;

    let compendium = merge_files(
        &group.name,
        &group.members,
        MergeStrategy::Templated,
        &config.merge,
    )?;
    compendium.write(config.output_dir.join(compendium_file_name(&group.name)))?;
    Ok(compendium)
}
