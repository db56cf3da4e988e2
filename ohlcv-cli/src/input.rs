use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::Args;

#[derive(Debug, Error)]
pub(crate) enum InputError {
    #[error("failed to open input file: {path:?}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub(crate) type Result<T> = std::result::Result<T, InputError>;

/// Открывает источник, выбранный в CLI:
/// - `--input PATH` -> файл
/// - без флага      -> stdin
pub(crate) fn open_input(args: &Args) -> Result<Box<dyn Read>> {
    match &args.input {
        Some(path) => open_file(path),
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_file(path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InputError::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_file_reports_path() {
        let err = open_file("/definitely/not/here.csv").err().unwrap();
        let InputError::OpenFile { path, source } = err;
        assert_eq!(path, PathBuf::from("/definitely/not/here.csv"));
        assert_eq!(source.kind(), io::ErrorKind::NotFound);
    }
}
