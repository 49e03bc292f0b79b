//! Streaming JSON Writer
//!
//! Writes a nested document piece by piece to any `io::Write` without holding
//! the tree in memory. The writer keeps only a stack of open levels, which it
//! uses to place separators and to reject unbalanced or misplaced calls.
//!
//! Layout: attributes and nested objects go on their own indented lines;
//! scalar array elements stay on one line (`"timings": [1.5, 2, null]`).

use crate::sink::ReportError;
use std::io::Write;

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Object,
    Array,
}

impl Level {
    fn name(self) -> &'static str {
        match self {
            Level::Object => "object",
            Level::Array => "array",
        }
    }
}

#[derive(Debug)]
struct Frame {
    level: Level,
    items: usize,
    // An array that holds objects is laid out one element per line
    block: bool,
}

/// Incremental JSON writer with nesting checks
#[derive(Debug)]
pub struct JsonWriter<W: Write> {
    out: W,
    stack: Vec<Frame>,
    started: bool,
}

impl<W: Write> JsonWriter<W> {
    /// Wrap an output sink
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: Vec::new(),
            started: false,
        }
    }

    /// Open levels
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Open the root object
    pub fn document_begin(&mut self) -> Result<(), ReportError> {
        if self.started {
            return Err(ReportError::Misplaced("document already started"));
        }
        self.started = true;
        self.out.write_all(b"{")?;
        self.push(Level::Object);
        Ok(())
    }

    /// Close the root object
    pub fn document_end(&mut self) -> Result<(), ReportError> {
        if self.stack.len() != 1 {
            return Err(ReportError::Unbalanced {
                expected: "document root",
                open: self.stack.len(),
            });
        }
        self.close(Level::Object)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    /// `"name": {` inside an object
    pub fn attr_object_begin(&mut self, name: &str) -> Result<(), ReportError> {
        self.attr_key(name)?;
        self.out.write_all(b"{")?;
        self.push(Level::Object);
        Ok(())
    }

    /// Close an object opened with [`attr_object_begin`](Self::attr_object_begin)
    pub fn attr_object_end(&mut self) -> Result<(), ReportError> {
        self.close(Level::Object)
    }

    /// `"name": [` inside an object
    pub fn array_begin(&mut self, name: &str) -> Result<(), ReportError> {
        self.attr_key(name)?;
        self.out.write_all(b"[")?;
        self.push(Level::Array);
        Ok(())
    }

    /// Close the innermost array
    pub fn array_end(&mut self) -> Result<(), ReportError> {
        self.close(Level::Array)
    }

    /// `"name": "value"`
    pub fn attr_string(&mut self, name: &str, value: &str) -> Result<(), ReportError> {
        self.attr_key(name)?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    /// `"name": 42`
    pub fn attr_uint(&mut self, name: &str, value: u64) -> Result<(), ReportError> {
        self.attr_key(name)?;
        write!(self.out, "{}", value)?;
        Ok(())
    }

    /// `"name": 1.25` (non-finite values become `null`)
    pub fn attr_double(&mut self, name: &str, value: f64) -> Result<(), ReportError> {
        self.attr_key(name)?;
        serde_json::to_writer(&mut self.out, &value)?;
        Ok(())
    }

    /// Open an object as an array element
    pub fn element_object_begin(&mut self) -> Result<(), ReportError> {
        self.element_prefix(true)?;
        self.out.write_all(b"{")?;
        self.push(Level::Object);
        Ok(())
    }

    /// Close an object opened with [`element_object_begin`](Self::element_object_begin)
    pub fn element_object_end(&mut self) -> Result<(), ReportError> {
        self.close(Level::Object)
    }

    /// String array element
    pub fn element_string(&mut self, value: &str) -> Result<(), ReportError> {
        self.element_prefix(false)?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    /// Number array element with shortest round-trip formatting
    pub fn element_double(&mut self, value: f64) -> Result<(), ReportError> {
        self.element_prefix(false)?;
        serde_json::to_writer(&mut self.out, &value)?;
        Ok(())
    }

    /// `null` array element
    pub fn element_null(&mut self) -> Result<(), ReportError> {
        self.element_prefix(false)?;
        self.out.write_all(b"null")?;
        Ok(())
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.out.flush()?;
        Ok(())
    }

    /// Flush and return the sink, failing if the document is incomplete
    pub fn finish(mut self) -> Result<W, ReportError> {
        if !self.stack.is_empty() || !self.started {
            return Err(ReportError::Unbalanced {
                expected: "closed document",
                open: self.stack.len(),
            });
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn push(&mut self, level: Level) {
        self.stack.push(Frame {
            level,
            items: 0,
            block: false,
        });
    }

    fn newline(&mut self, depth: usize) -> Result<(), ReportError> {
        self.out.write_all(b"\n")?;
        for _ in 0..depth {
            self.out.write_all(INDENT.as_bytes())?;
        }
        Ok(())
    }

    fn attr_key(&mut self, name: &str) -> Result<(), ReportError> {
        let depth = self.stack.len();
        let frame = self
            .stack
            .last_mut()
            .ok_or(ReportError::Misplaced("attribute outside the document"))?;
        if frame.level != Level::Object {
            return Err(ReportError::Misplaced("attribute inside an array"));
        }
        let separator = frame.items > 0;
        frame.items += 1;

        if separator {
            self.out.write_all(b",")?;
        }
        self.newline(depth)?;
        serde_json::to_writer(&mut self.out, name)?;
        self.out.write_all(b": ")?;
        Ok(())
    }

    fn element_prefix(&mut self, block: bool) -> Result<(), ReportError> {
        let depth = self.stack.len();
        let frame = self
            .stack
            .last_mut()
            .ok_or(ReportError::Misplaced("element outside the document"))?;
        if frame.level != Level::Array {
            return Err(ReportError::Misplaced("element inside an object"));
        }
        let separator = frame.items > 0;
        frame.items += 1;
        frame.block |= block;

        if block {
            if separator {
                self.out.write_all(b",")?;
            }
            self.newline(depth)?;
        } else if separator {
            self.out.write_all(b", ")?;
        }
        Ok(())
    }

    fn close(&mut self, level: Level) -> Result<(), ReportError> {
        match self.stack.last().map(|f| f.level) {
            Some(found) if found != level => {
                return Err(ReportError::Mismatched {
                    expected: level.name(),
                    found: found.name(),
                });
            }
            _ => {}
        }
        let Some(frame) = self.stack.pop() else {
            return Err(ReportError::Unbalanced {
                expected: level.name(),
                open: 0,
            });
        };

        let multiline = match frame.level {
            Level::Object => frame.items > 0,
            Level::Array => frame.block,
        };
        if multiline {
            let depth = self.stack.len();
            self.newline(depth)?;
        }
        self.out.write_all(match level {
            Level::Object => b"}",
            Level::Array => b"]",
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(writer: JsonWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_nested_document() {
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.attr_string("name", "copy").unwrap();
        w.attr_object_begin("inner").unwrap();
        w.array_begin("values").unwrap();
        w.element_double(1.5).unwrap();
        w.element_null().unwrap();
        w.element_double(2.0).unwrap();
        w.array_end().unwrap();
        w.attr_object_end().unwrap();
        w.document_end().unwrap();

        let text = written(w);
        assert_eq!(
            text,
            "{\n  \"name\": \"copy\",\n  \"inner\": {\n    \"values\": [1.5, null, 2.0]\n  }\n}\n"
        );
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["inner"]["values"][0], 1.5);
    }

    #[test]
    fn test_array_of_objects() {
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.array_begin("results").unwrap();
        for i in 0..2 {
            w.element_object_begin().unwrap();
            w.attr_uint("length", i).unwrap();
            w.element_object_end().unwrap();
        }
        w.array_end().unwrap();
        w.document_end().unwrap();

        let value: serde_json::Value = serde_json::from_str(&written(w)).unwrap();
        assert_eq!(value["results"][1]["length"], 1);
    }

    #[test]
    fn test_escapes_strings() {
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.attr_string("quote\"key", "line\nbreak \\ \"q\"").unwrap();
        w.document_end().unwrap();

        let value: serde_json::Value = serde_json::from_str(&written(w)).unwrap();
        assert_eq!(value["quote\"key"], "line\nbreak \\ \"q\"");
    }

    #[test]
    fn test_doubles_round_trip() {
        let samples = [3.0e-7, 0.1 + 0.2, 123_456.789_012_345, 1.0 / 3.0];
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.array_begin("v").unwrap();
        for s in samples {
            w.element_double(s).unwrap();
        }
        w.element_double(f64::NAN).unwrap();
        w.array_end().unwrap();
        w.document_end().unwrap();

        let value: serde_json::Value = serde_json::from_str(&written(w)).unwrap();
        for (i, s) in samples.iter().enumerate() {
            assert_eq!(value["v"][i].as_f64().unwrap(), *s);
        }
        assert!(value["v"][4].is_null());
    }

    #[test]
    fn test_empty_containers() {
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.array_begin("a").unwrap();
        w.array_end().unwrap();
        w.attr_object_begin("o").unwrap();
        w.attr_object_end().unwrap();
        w.document_end().unwrap();

        assert_eq!(written(w), "{\n  \"a\": [],\n  \"o\": {}\n}\n");
    }

    #[test]
    fn test_rejects_mismatched_end() {
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.array_begin("a").unwrap();
        assert!(matches!(
            w.attr_object_end(),
            Err(ReportError::Mismatched {
                expected: "object",
                found: "array"
            })
        ));
    }

    #[test]
    fn test_rejects_misplaced_items() {
        let mut w = JsonWriter::new(Vec::new());
        assert!(matches!(w.attr_uint("x", 1), Err(ReportError::Misplaced(_))));

        w.document_begin().unwrap();
        assert!(matches!(w.element_double(1.0), Err(ReportError::Misplaced(_))));

        w.array_begin("a").unwrap();
        assert!(matches!(w.attr_string("k", "v"), Err(ReportError::Misplaced(_))));
    }

    #[test]
    fn test_finish_requires_balance() {
        let mut w = JsonWriter::new(Vec::new());
        w.document_begin().unwrap();
        w.array_begin("a").unwrap();
        assert_eq!(w.depth(), 2);
        assert!(matches!(
            w.document_end(),
            Err(ReportError::Unbalanced { open: 2, .. })
        ));
        assert!(matches!(
            w.finish(),
            Err(ReportError::Unbalanced { open: 2, .. })
        ));
    }

    #[test]
    fn test_close_with_nothing_open() {
        let mut w = JsonWriter::new(Vec::new());
        assert!(matches!(
            w.array_end(),
            Err(ReportError::Unbalanced { open: 0, .. })
        ));
    }
}
