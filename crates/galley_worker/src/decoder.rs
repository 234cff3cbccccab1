//! Result Decoder
//!
//! Reads the output artifact after the worker has exited 0. The artifact is
//! untrusted: anything that is not a JSON array of flight rows is a worker
//! contract violation and reported as [`InvocationError::MalformedResult`].

use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::classifier::InvocationResult;
use crate::error::{malformed_result_message, DiagnosticOptions, InvocationError};
use crate::record::FlightRecord;

pub async fn decode_artifact(
    path: &Path,
    result: &InvocationResult,
    options: DiagnosticOptions,
) -> Result<Vec<FlightRecord>, InvocationError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Worker exited 0 without writing {}", path.display());
            return Err(malformed(result, options));
        }
        Err(e) => return Err(InvocationError::filesystem(path, e)),
    };

    let records = decode_records(&bytes).map_err(|reason| {
        warn!("Output artifact {} rejected: {}", path.display(), reason);
        malformed(result, options)
    })?;

    info!(
        rows = records.len(),
        "Decoded output artifact {}",
        path.display()
    );
    Ok(records)
}

/// Parse artifact bytes. The error is a human-readable reason for logs.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<FlightRecord>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {}", e))?;
    let records: Vec<FlightRecord> =
        serde_json::from_str(text).map_err(|e| format!("not a flight row array: {}", e))?;
    debug!(rows = records.len(), "Parsed flight rows");
    Ok(records)
}

fn malformed(result: &InvocationResult, options: DiagnosticOptions) -> InvocationError {
    InvocationError::MalformedResult {
        exit_code: result.exit_code,
        stderr: result.stderr.clone(),
        message: malformed_result_message(&result.stderr, result.exit_code, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROWS: &str = r#"[
        {"num_vol":"AF2","depart":"CDG","arrivee":"NCE","imma":"F-HBNA","sd_loc":"2025-01-02T07:00:00","sa_loc":"2025-01-02T08:30:00","j_class":0,"y_class":174},
        {"num_vol":"AF1","depart":"CDG","arrivee":"LHR","imma":"F-GKXA","sd_loc":"2025-01-02T06:00:00","sa_loc":"2025-01-02T06:20:00","j_class":12,"y_class":150}
    ]"#;

    fn exited_ok(stderr: &str) -> InvocationResult {
        InvocationResult {
            stderr: stderr.to_string(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_decodes_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, TWO_ROWS).unwrap();

        let rows = decode_artifact(&path, &exited_ok(""), DiagnosticOptions::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].flight_number, "AF2");
        assert_eq!(rows[1].flight_number, "AF1");
        assert_eq!(rows[1].business_seat_count, 12);
    }

    #[tokio::test]
    async fn test_empty_array_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "[]").unwrap();

        let rows = decode_artifact(&path, &exited_ok(""), DiagnosticOptions::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_prefers_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = decode_artifact(&path, &exited_ok("Missing column: Imma\n"), DiagnosticOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::MalformedResult { .. }));
        assert_eq!(err.to_string(), "Missing column: Imma: exit code 0");
        assert_eq!(err.exit_code(), Some(0));
    }

    #[tokio::test]
    async fn test_invalid_json_without_stderr_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "").unwrap();

        let err = decode_artifact(&path, &exited_ok("  "), DiagnosticOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "worker produced invalid output: exit code 0");
    }

    #[tokio::test]
    async fn test_object_instead_of_array_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, r#"{"num_vol":"AF1"}"#).unwrap();

        let err = decode_artifact(&path, &exited_ok(""), DiagnosticOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::MalformedResult { .. }));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_artifact(&dir.path().join("absent.json"), &exited_ok(""), DiagnosticOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::MalformedResult { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_artifact_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let err = decode_artifact(dir.path(), &exited_ok(""), DiagnosticOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::Filesystem { .. }));
    }

    #[test]
    fn test_non_utf8_is_rejected() {
        let reason = decode_records(&[0x5b, 0xff, 0x5d]).unwrap_err();
        assert!(reason.contains("UTF-8"));
    }
}
