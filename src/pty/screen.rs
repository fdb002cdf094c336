//! Virtual terminal screen backed by `avt`.
//!
//! The PTY read loop delivers raw byte chunks; chunk boundaries can fall in
//! the middle of a UTF-8 sequence, so a short carry buffer holds the
//! incomplete tail until the next chunk completes it.

pub struct Screen {
    vt: avt::Vt,
    cols: u16,
    rows: u16,
    /// Bytes held over from a chunk that ended mid-sequence
    pending: Vec<u8>,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .finish()
    }
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            vt: avt::Vt::new(cols as usize, rows as usize),
            cols,
            rows,
            pending: Vec::new(),
        }
    }

    /// Feed raw PTY output into the terminal model.
    pub fn feed(&mut self, data: &[u8]) {
        if data.is_empty() && self.pending.is_empty() {
            return;
        }
        self.pending.extend_from_slice(data);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    let _ = self.vt.feed_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(prefix) = std::str::from_utf8(&self.pending[..valid]) {
                        let _ = self.vt.feed_str(prefix);
                    }
                    match e.error_len() {
                        // Invalid bytes in the middle: replace and continue
                        Some(len) => {
                            let _ = self.vt.feed_str("\u{fffd}");
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete trailing sequence: carry it to the next chunk
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Resize the terminal grid. Idempotent.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if cols == self.cols && rows == self.rows {
            return;
        }
        let _ = self.vt.resize(cols as usize, rows as usize);
        self.cols = cols;
        self.rows = rows;
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Visible rows of the screen.
    pub fn rows_text(&self) -> Vec<String> {
        self.vt.view().map(|line| line.text()).collect()
    }

    /// Textual rendering of the screen: visible rows joined by newlines.
    pub fn snapshot(&self) -> String {
        self.rows_text().join("\n")
    }

    /// The last `n` rows joined by newlines; used by the status heuristics.
    pub fn tail(&self, n: usize) -> String {
        let rows = self.rows_text();
        let start = rows.len().saturating_sub(n);
        rows[start..].join("\n")
    }
}
