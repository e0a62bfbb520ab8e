//! Naming convention shared by the export, object storage and warehouse layers.
//!
//! An export names every table `{source}.public.{table}`. Its files live under the storage
//! target `{source}/public.{table}` and are loaded into the warehouse table
//! `{dataset}.{table}`.

use tracing::debug;

use crate::types::{ExportStatusDocument, TableIdentity, WarehouseDatasetId};

/// Separator between the source database and the table in an export target.
const PUBLIC_SCHEMA_SEPARATOR: &str = ".public.";

/// Glob appended to a storage target to match the exported files of a table.
const DATA_FILES_GLOB: &str = "*/*.parquet";

/// Rewrites an export target into its storage target name.
///
/// Returns [`None`] unless the target contains exactly one `.public.` separator with
/// non-empty segments on both sides. The first dot of the target becomes the path
/// separator and every other dot is kept.
pub fn storage_target_name(target: &str) -> Option<String> {
    if target.matches(PUBLIC_SCHEMA_SEPARATOR).count() != 1 {
        return None;
    }

    let (source, table) = target.split_once(PUBLIC_SCHEMA_SEPARATOR)?;
    if source.is_empty() || table.is_empty() {
        return None;
    }

    Some(target.replacen('.', "/", 1))
}

/// Derives the storage target names of every exportable table in `document`.
///
/// Records whose target does not follow the naming convention are skipped.
pub fn derive_storage_target_names(document: &ExportStatusDocument) -> Vec<String> {
    document
        .per_table_status
        .iter()
        .filter_map(|record| {
            let name = storage_target_name(&record.target);
            if name.is_none() {
                debug!(export_target = %record.target, "skipping export record outside the public schema");
            }

            name
        })
        .collect()
}

/// Returns the table name of a storage target, the text after its last dot.
pub fn table_name(storage_target: &str) -> &str {
    storage_target
        .rsplit_once('.')
        .map_or(storage_target, |(_, table)| table)
}

/// Derives the warehouse table id `{dataset_id}.{table}` for a storage target.
pub fn derive_warehouse_table_id(dataset_id: &str, storage_target: &str) -> String {
    format!("{dataset_id}.{}", table_name(storage_target))
}

/// Derives the paired storage target and warehouse table of every exportable table.
pub fn derive_table_identities(
    dataset: &WarehouseDatasetId,
    document: &ExportStatusDocument,
) -> Vec<TableIdentity> {
    derive_storage_target_names(document)
        .into_iter()
        .map(|storage_target| TableIdentity {
            table_name: table_name(&storage_target).to_owned(),
            dataset: dataset.clone(),
            storage_target,
        })
        .collect()
}

/// Builds the file path pattern matching the exported files of a storage target.
pub fn storage_data_path(export_base_path: &str, storage_target: &str) -> String {
    format!(
        "{}/{}/{DATA_FILES_GLOB}",
        export_base_path.trim_end_matches('/'),
        storage_target.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableExportRecord;

    fn document(targets: &[&str]) -> ExportStatusDocument {
        ExportStatusDocument::from_records(
            targets.iter().copied().map(TableExportRecord::new).collect(),
        )
    }

    #[test]
    fn public_targets_are_rewritten() {
        let names = derive_storage_target_names(&document(&["mydb.public.orders"]));
        assert_eq!(names, vec!["mydb/public.orders"]);
    }

    #[test]
    fn non_public_targets_are_dropped() {
        let names = derive_storage_target_names(&document(&[
            "mydb.other.orders",
            "mydb.public.",
            ".public.orders",
            "mydb.public.a.public.b",
            "mydb",
        ]));
        assert!(names.is_empty());
    }

    #[test]
    fn dots_after_the_separator_are_preserved() {
        assert_eq!(
            storage_target_name("mydb.public.orders.v2").as_deref(),
            Some("mydb/public.orders.v2")
        );
    }

    #[test]
    fn dotted_sources_keep_their_dots() {
        assert_eq!(
            storage_target_name("my.db.public.orders").as_deref(),
            Some("my/db.public.orders")
        );

        let dataset = WarehouseDatasetId::parse("proj.dataset", "proj").unwrap();
        let identities = derive_table_identities(&dataset, &document(&["my.db.public.orders"]));
        assert_eq!(identities[0].table_name, "orders");
        assert_eq!(identities[0].warehouse_table_id(), "proj.dataset.orders");
    }

    #[test]
    fn warehouse_table_id_uses_last_segment() {
        assert_eq!(
            derive_warehouse_table_id("proj.dataset", "mydb/public.orders"),
            "proj.dataset.orders"
        );
    }

    #[test]
    fn identities_pair_storage_target_and_table() {
        let dataset = WarehouseDatasetId::parse("proj.dataset", "proj").unwrap();
        let identities = derive_table_identities(
            &dataset,
            &document(&["db.public.users", "db.internal.sessions", "db.public.orders"]),
        );

        let pairs: Vec<(&str, String)> = identities
            .iter()
            .map(|identity| (identity.storage_target.as_str(), identity.warehouse_table_id()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("db/public.users", "proj.dataset.users".to_owned()),
                ("db/public.orders", "proj.dataset.orders".to_owned()),
            ]
        );
    }

    #[test]
    fn data_path_joins_with_single_separator() {
        assert_eq!(
            storage_data_path("s3://bucket/task", "db/public.users"),
            "s3://bucket/task/db/public.users/*/*.parquet"
        );
        assert_eq!(
            storage_data_path("s3://bucket/task/", "db/public.users"),
            "s3://bucket/task/db/public.users/*/*.parquet"
        );
    }
}
