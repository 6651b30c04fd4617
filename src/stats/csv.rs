use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Buffered CSV file that writes its header lazily before the first row.
pub(crate) struct CsvSink {
    writer: BufWriter<File>,
    wrote_header: bool,
}

impl CsvSink {
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            wrote_header: false,
        })
    }

    pub(crate) fn write_row<H, R>(&mut self, header: H, row: R)
    where
        H: FnOnce(&mut dyn Write) -> io::Result<()>,
        R: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        if !self.wrote_header {
            let _ = header(&mut self.writer);
            self.wrote_header = true;
        }
        let _ = row(&mut self.writer);
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
