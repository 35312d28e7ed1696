use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, warn};

use super::error::IoError;
use crate::domain::{Origin, RawLine};

/// Outcome of the pre-read checks on one extract file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractCheck {
    pub path: PathBuf,
    pub size: u64,
    /// A blank line was appended because the file was empty
    pub repaired: bool,
}

/// Verify an extract exists, is fresh, and is non-empty.
///
/// A zero-byte file is repaired by appending one blank line; if it is still
/// empty afterwards the check fails.
pub async fn check_extract(
    path: &Path,
    max_age: Duration,
    now: SystemTime,
) -> Result<ExtractCheck, IoError> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IoError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    // a modification time in the future counts as brand new
    let age = now
        .duration_since(metadata.modified()?)
        .unwrap_or(Duration::ZERO);
    if age > max_age {
        return Err(IoError::Stale {
            path: path.to_path_buf(),
            age_secs: age.as_secs(),
            max_age_secs: max_age.as_secs(),
        });
    }

    if metadata.len() > 0 {
        return Ok(ExtractCheck {
            path: path.to_path_buf(),
            size: metadata.len(),
            repaired: false,
        });
    }

    warn!(path = %path.display(), "Extract is empty, appending a blank line");
    let mut file = OpenOptions::new().append(true).open(path).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    drop(file);

    let size = fs::metadata(path).await?.len();
    if size == 0 {
        return Err(IoError::EmptyAfterRepair(path.to_path_buf()));
    }

    Ok(ExtractCheck {
        path: path.to_path_buf(),
        size,
        repaired: true,
    })
}

/// Lines of one extract in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractLines {
    pub lines: Vec<RawLine>,
    /// Line numbers left out because they hold non-ASCII bytes
    pub non_ascii: Vec<usize>,
}

impl ExtractLines {
    /// Physical lines in the file, kept or not
    pub fn total(&self) -> usize {
        self.lines.len() + self.non_ascii.len()
    }
}

/// Read every line of an extract, stripping `\n` / `\r\n`.
///
/// Fields sit at fixed byte offsets, so only ASCII lines are kept; any other
/// line is reported by number and never re-encoded.
pub async fn read_lines(path: &Path, origin: Origin) -> Result<ExtractLines, IoError> {
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut extract = ExtractLines::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        if !buf.is_ascii() {
            debug!(path = %path.display(), %origin, line_no, "Skipping line with non-ASCII bytes");
            extract.non_ascii.push(line_no);
            continue;
        }
        // ASCII is valid UTF-8 byte for byte
        let text = String::from_utf8(std::mem::take(&mut buf))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        extract.lines.push(RawLine {
            text,
            origin,
            line_no,
        });
    }

    if !extract.non_ascii.is_empty() {
        warn!(
            path = %path.display(),
            %origin,
            lines = extract.non_ascii.len(),
            first = extract.non_ascii[0],
            "Extract has lines with non-ASCII bytes"
        );
    }
    debug!(path = %path.display(), %origin, lines = extract.total(), "Read extract");
    Ok(extract)
}

/// Path a stream is written under until it is closed
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Remove `target` and its `.partial` file, returning how many existed
pub async fn remove_artifact(target: &Path) -> Result<usize, IoError> {
    let mut removed = 0;
    for path in [partial_path(target), target.to_path_buf()] {
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

/// Write lines to `target` via a `.partial` file renamed on completion
pub async fn write_lines(target: &Path, lines: &[&str]) -> Result<u64, IoError> {
    let partial = partial_path(target);
    let mut writer = BufWriter::new(File::create(&partial).await?);
    let mut count = 0u64;

    for line in lines.iter() {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        count += 1;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    fs::rename(&partial, target).await?;

    debug!(path = %target.display(), lines = count, "Wrote intermediate file");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DAY: Duration = Duration::from_secs(86_400);

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_extract(&dir.path().join("nope.dat"), DAY, SystemTime::now()).await;
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[tokio::test]
    async fn stale_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "old.dat", "00000000001\n");
        let later = SystemTime::now() + 2 * DAY;

        let result = check_extract(&path, DAY, later).await;
        assert!(matches!(result, Err(IoError::Stale { .. })));
    }

    #[tokio::test]
    async fn fresh_file_passes_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.dat", "00000000001\n");

        let check = check_extract(&path, DAY, SystemTime::now()).await.unwrap();
        assert!(!check.repaired);
        assert_eq!(check.size, 12);
    }

    #[tokio::test]
    async fn empty_file_is_repaired_with_a_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.dat", "");

        let check = check_extract(&path, DAY, SystemTime::now()).await.unwrap();
        assert!(check.repaired);
        assert_eq!(check.size, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\n");
    }

    #[tokio::test]
    async fn read_lines_strips_terminators_and_numbers_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.dat", "first\r\nsecond\nlast-no-newline");

        let lines = read_lines(&path, Origin::Secondary).await.unwrap().lines;
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "last-no-newline"]);
        assert_eq!(lines[2].line_no, 3);
        assert!(lines.iter().all(|l| l.origin == Origin::Secondary));
    }

    #[tokio::test]
    async fn read_lines_sets_aside_non_ascii_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.dat");
        let mut bytes = b"00000000050 SMITH\n".to_vec();
        bytes.extend_from_slice(&[b'0', b'1', 0xE9, b'X', b'\n']);
        bytes.extend_from_slice(b"00000000123 JONES\n");
        std::fs::write(&path, bytes).unwrap();

        let extract = read_lines(&path, Origin::Primary).await.unwrap();
        assert_eq!(extract.non_ascii, vec![2]);
        assert_eq!(extract.total(), 3);
        let numbers: Vec<_> = extract.lines.iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(extract.lines[1].text, "00000000123 JONES");
    }

    #[tokio::test]
    async fn write_lines_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("merged.dat");

        let count = write_lines(&target, &["a", "b"]).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "a\nb\n");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn remove_artifact_clears_finished_and_partial() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("north.merged.dat");
        std::fs::write(&target, "a\n").unwrap();
        std::fs::write(partial_path(&target), "b\n").unwrap();

        assert_eq!(remove_artifact(&target).await.unwrap(), 2);
        assert!(!target.exists());
        assert_eq!(remove_artifact(&target).await.unwrap(), 0);
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/out/x.entity.dat")),
            PathBuf::from("/out/x.entity.dat.partial")
        );
    }
}
