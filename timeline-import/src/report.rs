//! Success and failure lines printed after an upload.

use std::io::Write;

use crate::client::UploadResponse;

/// Print the outcome and return the exit code: 0 for a 2xx answer, 1
/// otherwise.
pub fn report(response: &UploadResponse, out: &mut impl Write, err: &mut impl Write) -> i32 {
    if response.is_success() {
        let detail = response
            .message()
            .unwrap_or_else(|| response.body.to_string());
        let _ = writeln!(out, "[+] Import succeeded: {detail}");
        0
    } else {
        let _ = writeln!(
            err,
            "[-] Import failed (HTTP {}): {}",
            response.status.as_u16(),
            response.body
        );
        1
    }
}
