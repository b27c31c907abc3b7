/// Byte offsets of each line start, for offset-to-position mapping.
pub fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (index, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(index + 1);
        }
    }
    starts
}

/// Map a byte offset to a 1-based (line, column) pair. Columns count bytes
/// from the line start.
pub fn line_col(starts: &[usize], offset: usize) -> (usize, usize) {
    let line = match starts.binary_search(&offset) {
        Ok(exact) => exact,
        Err(insert) => insert.saturating_sub(1),
    };
    let column = offset - starts[line] + 1;
    (line + 1, column)
}
