//! Window accumulation and batch numbering.
//!
//! The coalescer buffers completed graphs and cuts a [`Window`] every
//! `batch_size`-th arrival, plus one final partial window at stream
//! end. It is owned by the single collector draining the results
//! channel, so the buffer has exactly one writer and the cut (snapshot
//! and clear via `mem::take`) is atomic with respect to further pushes
//! by construction.
//!
//! Batch numbers are dense and 1-based: window `k` covers arrivals
//! `(k-1)*batch_size + 1 ..= k*batch_size`, the last window possibly
//! fewer. `completed_so_far` is the cumulative arrival count at the
//! moment the window closed, which is exactly the value the job's
//! progress counter is set to when the window is persisted.

use dagbatch_core::{Error, Result, TaskGraph};

/// One closed window, ready to compress and persist.
#[derive(Debug)]
pub struct Window {
    /// 1-based, dense within the job.
    pub batch_number: i64,
    /// The graphs in arrival order. Order within a window carries no
    /// meaning; only the count does.
    pub graphs: Vec<TaskGraph>,
    /// Cumulative completed units at window close.
    pub completed_so_far: i64,
}

/// Groups an incoming stream of graphs into fixed-size windows.
pub struct BatchCoalescer {
    batch_size: usize,
    buffer: Vec<TaskGraph>,
    windows_cut: i64,
    total_seen: i64,
}

impl BatchCoalescer {
    /// Creates a coalescer with the given window size.
    ///
    /// # Errors
    ///
    /// A `batch_size` of 0 is a configuration error.
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "batch size must be at least 1".into(),
            });
        }
        Ok(Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            windows_cut: 0,
            total_seen: 0,
        })
    }

    /// Accumulates one graph; returns the closed window when this
    /// arrival hits the window boundary.
    pub fn push(&mut self, graph: TaskGraph) -> Option<Window> {
        self.buffer.push(graph);
        self.total_seen += 1;

        if self.buffer.len() == self.batch_size {
            Some(self.cut())
        } else {
            None
        }
    }

    /// Closes the stream, returning the final partial window if any
    /// graphs remain buffered.
    pub fn finish(mut self) -> Option<Window> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.cut())
        }
    }

    /// Cumulative number of graphs accumulated so far.
    pub fn total_seen(&self) -> i64 {
        self.total_seen
    }

    fn cut(&mut self) -> Window {
        self.windows_cut += 1;
        Window {
            batch_number: self.windows_cut,
            graphs: core::mem::take(&mut self.buffer),
            completed_so_far: self.total_seen,
        }
    }
}
