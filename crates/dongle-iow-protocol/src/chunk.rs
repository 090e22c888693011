//! Splits a bus write into report-sized chunks.

use crate::report::{ReportCapacity, ReportFrame, fill_write};

/// Plans the write reports for `payload` (address byte already prefixed).
///
/// The first report carries Start, and the last carries Stop unless
/// `hold_open` is set, which leaves the bus claimed for a following read.
/// An empty payload still produces one report so the bus sees a Start.
pub fn plan_write_reports(
    capacity: ReportCapacity,
    payload: &[u8],
    hold_open: bool,
) -> Vec<ReportFrame> {
    let chunk_len = capacity.chunk_len();
    if payload.len() <= chunk_len {
        return vec![fill_write(capacity, payload, true, !hold_open)];
    }

    let chunks: Vec<&[u8]> = payload.chunks(chunk_len).collect();
    let last = chunks.len().saturating_sub(1);
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| fill_write(capacity, chunk, i == 0, i == last && !hold_open))
        .collect()
}
