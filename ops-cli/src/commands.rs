//! Subcommand implementations over any [`RecordStore`]

use anyhow::{bail, Context, Result};
use colored::Colorize;
use record_sync::{
    MedicalRecord, PassOutcome, RecordStore, ReconcileReport, SyncReconciler, SyncStatus,
    SyncTransport,
};

use crate::cli::AddArgs;

/// Validate and store a new pending record
pub async fn add<S: RecordStore + ?Sized>(store: &S, args: AddArgs) -> Result<MedicalRecord> {
    let id = args
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut record = MedicalRecord::new_pending(
        id,
        args.patient_name,
        args.diagnosis,
        args.treatment,
        args.date,
        args.created_by,
    );
    if let Some(path) = args.file_path {
        record = record.with_file_path(path);
    }

    record.validate().context("Record rejected")?;
    if store.get_by_id(&record.id).await?.is_some() {
        bail!("A record with id '{}' already exists", record.id);
    }

    store.upsert(record.clone()).await?;
    tracing::info!(record_id = %record.id, "Record created");
    Ok(record)
}

pub async fn list<S: RecordStore + ?Sized>(store: &S, unsynced: bool) -> Result<Vec<MedicalRecord>> {
    let records = if unsynced {
        store.list_unsynced().await?
    } else {
        store.list_all().await?
    };
    Ok(records)
}

pub async fn show<S: RecordStore + ?Sized>(store: &S, id: &str) -> Result<MedicalRecord> {
    store
        .get_by_id(id)
        .await?
        .with_context(|| format!("No record with id '{id}'"))
}

/// Explicit status change by the operator
pub async fn set_status<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
    status: &str,
) -> Result<MedicalRecord> {
    let status: SyncStatus = status.parse()?;
    let mut record = show(store, id).await?;
    store.set_sync_status(id, status).await?;
    tracing::info!(record_id = %id, status = %status, "Record status set");
    record.sync_status = status;
    Ok(record)
}

pub async fn sync_once<S, T>(reconciler: &SyncReconciler<S, T>) -> ReconcileReport
where
    S: RecordStore + ?Sized,
    T: SyncTransport + ?Sized,
{
    reconciler.reconcile().await
}

pub fn status_label(status: SyncStatus) -> String {
    match status {
        SyncStatus::Synced => status.as_str().green().to_string(),
        SyncStatus::Pending => status.as_str().yellow().to_string(),
        SyncStatus::Error => status.as_str().red().to_string(),
    }
}

/// One table row; clinical fields are left out of listings
pub fn format_record_line(record: &MedicalRecord) -> String {
    format!(
        "{:<38} {:<12} {:<16} {}",
        record.id,
        record.date,
        record.created_by,
        status_label(record.sync_status)
    )
}

pub fn format_report(report: &ReconcileReport) -> String {
    let headline = match report.outcome {
        PassOutcome::NothingToSync => "Nothing to sync".normal(),
        PassOutcome::Completed => "Sync completed".green(),
        PassOutcome::TransportFailed => "Sync failed: server unreachable".red(),
        PassOutcome::StorageFailed => "Sync failed: local store unavailable".red(),
        PassOutcome::Coalesced => "Sync already running; follow-up queued".yellow(),
    };

    if report.submitted == 0 {
        return headline.to_string();
    }

    let mut summary = format!(
        "{headline}\n  submitted: {}\n  accepted:  {}",
        report.submitted, report.accepted
    );
    if report.unacknowledged > 0 {
        summary.push_str(&format!("\n  not accepted (kept as-is): {}", report.unacknowledged));
    }
    if report.marked_error > 0 {
        summary.push_str(&format!("\n  marked error: {}", report.marked_error));
    }
    if report.modified_in_flight > 0 {
        summary.push_str(&format!("\n  edited during sync (still pending): {}", report.modified_in_flight));
    }
    summary
}
