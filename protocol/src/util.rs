use {
    anyhow::Result,
    fs_err::{OpenOptions, create_dir_all},
    std::{
        io::{self, Write},
        path::Path,
    },
};

/// Opens `log_file` for appending, creating parent directories as needed.
/// Falls back to stdout if no file is specified.
#[inline]
pub fn log_writer(log_file: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    let Some(log_file) = log_file else {
        return Ok(Box::new(io::stdout()));
    };
    if let Some(dir) = log_file.parent() {
        create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    Ok(Box::new(file))
}

#[test]
fn log_writer_appends() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("logs").join("sealzip.log");
    for line in ["first", "second"] {
        let mut writer = log_writer(Some(&path)).unwrap();
        writeln!(writer, "{line}").unwrap();
    }
    assert_eq!(fs_err::read_to_string(&path).unwrap(), "first\nsecond\n");
}
