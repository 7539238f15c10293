//! Incremental parsing of a JSON document that is still being streamed.
//!
//! The parser tracks nesting as text arrives and remembers the last
//! *checkpoint*: a prefix of the buffer that becomes a valid document once
//! the still-open containers are closed. Checkpoints are taken
//!
//! * right after `{` or `[`,
//! * right after the closing quote of a string value (never a key),
//! * right before a `,`,
//! * right after `}` or `]`.
//!
//! Strings are therefore never cut in half and scalars only appear once
//! their delimiter has been seen, so a snapshot contains complete values
//! only.

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object { awaiting_key: bool },
    Array,
}

/// Accumulates streamed text and produces closed-off snapshots.
#[derive(Debug, Default)]
pub struct PartialJson {
    buf: String,
    scanned: usize,
    stack: Vec<Frame>,
    in_string: bool,
    string_is_key: bool,
    escaped: bool,
    checkpoint: usize,
    closers: String,
    emitted: usize,
}

impl PartialJson {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    pub fn buffer(&self) -> &str {
        &self.buf
    }

    /// Append `delta` and return a new snapshot if the checkpoint moved.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buf.push_str(delta);
        self.scan();

        if self.checkpoint > self.emitted {
            self.emitted = self.checkpoint;
            self.snapshot()
        } else {
            None
        }
    }

    /// The latest snapshot, if any checkpoint has been reached.
    pub fn snapshot(&self) -> Option<String> {
        if self.checkpoint == 0 {
            return None;
        }
        let mut text = String::with_capacity(self.checkpoint + self.closers.len());
        text.push_str(&self.buf[..self.checkpoint]);
        text.push_str(&self.closers);
        Some(text)
    }

    fn scan(&mut self) {
        while self.scanned < self.buf.len() {
            let byte = self.buf.as_bytes()[self.scanned];
            let at = self.scanned;
            self.scanned += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                    if self.string_is_key {
                        if let Some(Frame::Object { awaiting_key }) = self.stack.last_mut() {
                            *awaiting_key = false;
                        }
                    } else {
                        self.mark(at + 1);
                    }
                }
                continue;
            }

            match byte {
                b'"' => {
                    self.in_string = true;
                    self.string_is_key = matches!(
                        self.stack.last(),
                        Some(Frame::Object { awaiting_key: true })
                    );
                }
                b'{' => {
                    self.stack.push(Frame::Object { awaiting_key: true });
                    self.mark(at + 1);
                }
                b'[' => {
                    self.stack.push(Frame::Array);
                    self.mark(at + 1);
                }
                b'}' | b']' => {
                    self.stack.pop();
                    self.mark(at + 1);
                }
                b',' => {
                    self.mark(at);
                    if let Some(Frame::Object { awaiting_key }) = self.stack.last_mut() {
                        *awaiting_key = true;
                    }
                }
                _ => {}
            }
        }
    }

    fn mark(&mut self, position: usize) {
        self.checkpoint = position;
        self.closers = self
            .stack
            .iter()
            .rev()
            .map(|frame| match frame {
                Frame::Object { .. } => '}',
                Frame::Array => ']',
            })
            .collect();
    }
}
