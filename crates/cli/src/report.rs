use anyhow::Result;
use kubeauto_cluster::{ClusterSummary, UserRecord};
use std::fmt::Write as _;
use std::io::{self, Write};

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn render_clusters(rows: &[ClusterSummary]) -> String {
    let mut out = String::from("Managed clusters:");
    for (idx, row) in rows.iter().enumerate() {
        let prefix = if row.current { "==> " } else { "    " };
        let _ = write!(out, "\n{prefix}{}: {}", idx + 1, row.name);
        for pending in &row.pending {
            let _ = write!(out, "  [pending: {pending}]");
        }
    }
    out
}

pub(crate) fn render_users(records: &[UserRecord]) -> String {
    let mut out = format!("{:<30} {:<15} {:<20}", "USER", "TYPE", "EXPIRY");
    out.push('\n');
    out.push_str(&"-".repeat(66));
    for record in records {
        let _ = write!(
            out,
            "\n{:<30} {:<15} {:<20}",
            record.name,
            record.kind,
            record.expiry.as_deref().unwrap_or("-")
        );
    }
    out
}
