use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A FASTQ record as four lines of text, with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub id: String,
    pub seq: String,
    pub sep: String,
    pub qual: String,
}

/// Reads FASTQ records as groups of four lines.
///
/// No attempt is made to validate the structure of a record: the `@` and `+` markers are not
/// checked, and the sequence and quality lines may have different lengths. A group where any
/// of the four lines is empty or missing is treated as the end of the stream.
pub struct FastqReader<R: BufRead> {
    reader: R,
    line_buf: String,
    eof: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: String::with_capacity(512),
            eof: false,
        }
    }

    /// Reads one line, returning `None` if it is empty after trimming or the stream has ended.
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.line_buf.clear();
        if self.reader.read_line(&mut self.line_buf)? == 0 {
            return Ok(None);
        }

        let line = self.line_buf.trim();
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line.to_string()))
        }
    }

    /// Reads the next FASTQ record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Successfully read a record
    /// - `Ok(None)` - End of stream, or an incomplete trailing record
    /// - `Err(e)` - I/O error, including input which is not valid UTF-8
    pub fn read_next(&mut self) -> Result<Option<FastqRecord>> {
        if self.eof {
            return Ok(None);
        }

        // all four lines are consumed, even when an earlier one is empty
        let lines = [
            self.next_line()?,
            self.next_line()?,
            self.next_line()?,
            self.next_line()?,
        ];

        match lines {
            [Some(id), Some(seq), Some(sep), Some(qual)] => {
                Ok(Some(FastqRecord { id, seq, sep, qual }))
            }
            _ => {
                self.eof = true;
                Ok(None)
            }
        }
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Opens a FASTQ file for reading. Files ending in `.gz` are decompressed.
pub fn open_fastq<P: AsRef<Path>>(path: P) -> Result<FastqReader<Box<dyn BufRead>>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Unable to open file {}", path.display()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(path) {
        Box::new(BufReader::with_capacity(1024 * 1024, MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(1024 * 1024, file))
    };

    Ok(FastqReader::new(reader))
}

/// A FASTQ output file, compressed if its path ends in `.gz`.
pub enum FastqWriter {
    Plain(BufWriter<File>),
    Gzipped(GzEncoder<BufWriter<File>>),
}

impl FastqWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Unable to create file {}", path.display()))?;
        let writer = BufWriter::new(file);

        if is_gzipped(path) {
            Ok(FastqWriter::Gzipped(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(FastqWriter::Plain(writer))
        }
    }

    /// Flushes all buffered output, writing the gzip trailer if compressed.
    pub fn finish(self) -> Result<()> {
        match self {
            FastqWriter::Plain(mut w) => w.flush()?,
            FastqWriter::Gzipped(gz) => gz.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for FastqWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            FastqWriter::Plain(w) => w.write(buf),
            FastqWriter::Gzipped(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            FastqWriter::Plain(w) => w.flush(),
            FastqWriter::Gzipped(w) => w.flush(),
        }
    }
}

/// Writes a record as four newline-terminated lines.
pub fn write_record(writer: &mut impl Write, record: &FastqRecord) -> std::io::Result<()> {
    writeln!(
        writer,
        "{}\n{}\n{}\n{}",
        record.id, record.seq, record.sep, record.qual
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn reads_four_line_records() {
        let input = "@r1\nACGT\n+\nIIII\n@r2\n  GGCC \n+\n!!!!\n";
        let records: Vec<_> = FastqReader::new(Cursor::new(input))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].seq, "GGCC");
        assert_eq!(records[1].qual, "!!!!");
    }

    #[test]
    fn incomplete_trailing_record_ends_the_stream() {
        let input = "@r1\nACGT\n+\nIIII\n@r2\nACGT\n+\n";
        let mut reader = FastqReader::new(Cursor::new(input));

        assert!(reader.read_next().unwrap().is_some());
        assert!(reader.read_next().unwrap().is_none());
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn blank_line_ends_the_stream() {
        let input = "@r1\nACGT\n+\nIIII\n\n@r2\nACGT\n+\nIIII\n";
        let records: Vec<_> = FastqReader::new(Cursor::new(input))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn gzip_output_can_be_read_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.fastq.gz");

        let record = FastqRecord {
            id: "@r1".to_string(),
            seq: "ACGTN".to_string(),
            sep: "+".to_string(),
            qual: "IIIII".to_string(),
        };

        let mut writer = FastqWriter::create(&path)?;
        write_record(&mut writer, &record)?;
        writer.finish()?;

        let mut raw = String::new();
        MultiGzDecoder::new(File::open(&path)?).read_to_string(&mut raw)?;
        assert_eq!(raw, "@r1\nACGTN\n+\nIIIII\n");

        let mut reader = open_fastq(&path)?;
        assert_eq!(reader.read_next()?, Some(record));

        Ok(())
    }

    #[test]
    fn reads_every_gzip_member() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("joined.fastq.gz");

        // e.g. two gzipped files joined with `cat`
        let mut joined = Vec::new();
        for chunk in ["@r1\nACGT\n+\nIIII\n", "@r2\nGGCC\n+\n!!!!\n"] {
            let mut gz = GzEncoder::new(Vec::new(), Compression::default());
            gz.write_all(chunk.as_bytes())?;
            joined.extend(gz.finish()?);
        }
        std::fs::write(&path, joined)?;

        let ids: Vec<String> = open_fastq(&path)?
            .map(|r| r.map(|r| r.id))
            .collect::<Result<_>>()?;
        assert_eq!(ids, vec!["@r1", "@r2"]);

        Ok(())
    }
}
