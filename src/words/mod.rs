//! Random words drawn from a newline-delimited word list on disk.
//!
//! Words are sampled by seeking to a random byte offset, skipping to the end
//! of the current line and returning the next full line. Memory use does not
//! depend on the size of the list. Lines that follow long lines are slightly
//! more likely to be picked; that bias is accepted.

use crate::error::GenerationError;
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes scanned for a line boundary before the list is declared corrupt.
pub const MAX_SCAN_BYTES: usize = 1000;

/// Returned in place of a line that is not valid UTF-8
pub const UNDECODABLE_WORD: &str = "UnicodeIsFun";

/// Substituted for a failed draw inside a phrase
pub const MISSING_WORD: &str = "NULL";

/// Substituted for a failed draw when filling the category pool
pub const MISSING_CATEGORY: &str = "unknown";

/// Seekable word list plus a small pool of category words.
pub struct WordSource {
    reader: BufReader<File>,
    path: PathBuf,
    len: u64,
    categories: Vec<String>,
}

impl WordSource {
    /// Open the list at `path` and draw `pool_size` category words from it.
    pub fn open<R: Rng + ?Sized>(
        path: &Path,
        pool_size: usize,
        rng: &mut R,
    ) -> Result<Self, GenerationError> {
        let file = File::open(path).map_err(|source| GenerationError::WordList {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| GenerationError::WordList {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let mut source = Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            len,
            categories: Vec::with_capacity(pool_size),
        };

        for _ in 0..pool_size {
            let word = source
                .random_word(rng)?
                .unwrap_or_else(|| MISSING_CATEGORY.to_string());
            source.categories.push(word);
        }

        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Draw one line from the list.
    ///
    /// `Ok(None)` means the draw landed in the last line and found no
    /// following line; callers substitute a sentinel.
    pub fn random_word<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Option<String>, GenerationError> {
        if self.len == 0 {
            return Ok(None);
        }
        let offset = rng.random_range(0..self.len);
        let io_err = |source| GenerationError::WordList {
            path: self.path.clone(),
            source,
        };

        self.reader.seek(SeekFrom::Start(offset)).map_err(io_err)?;

        let mut scanned = 0usize;
        loop {
            let buf = self.reader.fill_buf().map_err(io_err)?;
            if buf.is_empty() {
                return Ok(None);
            }
            let window = buf.len().min(MAX_SCAN_BYTES + 1 - scanned);
            match memchr::memchr(b'\n', &buf[..window]) {
                Some(i) => {
                    self.reader.consume(i + 1);
                    break;
                }
                None => {
                    scanned += window;
                    self.reader.consume(window);
                    if scanned > MAX_SCAN_BYTES {
                        return Err(GenerationError::CorruptWordList {
                            path: self.path.clone(),
                            limit: MAX_SCAN_BYTES,
                        });
                    }
                }
            }
        }

        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line).map_err(io_err)?;
        if read == 0 {
            return Ok(None);
        }

        match String::from_utf8(line) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(_) => Ok(Some(UNDECODABLE_WORD.to_string())),
        }
    }

    /// `n` words joined by spaces; failed draws become [`MISSING_WORD`].
    pub fn random_words<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        n: usize,
    ) -> Result<String, GenerationError> {
        let mut words = Vec::with_capacity(n);
        for _ in 0..n {
            let word = self
                .random_word(rng)?
                .unwrap_or_else(|| MISSING_WORD.to_string());
            words.push(word);
        }
        Ok(words.join(" "))
    }

    /// One word from the category pool.
    pub fn random_category_word<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if self.categories.is_empty() {
            return MISSING_CATEGORY.to_string();
        }
        let i = rng.random_range(0..self.categories.len());
        self.categories[i].clone()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn word_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    const WORDS: &str = "apple\nbanana\ncherry\ndate\nelder\nfig\ngrape\n";

    #[test]
    fn test_words_come_from_list() {
        let file = word_file(WORDS.as_bytes());
        let mut rng = StdRng::seed_from_u64(42);
        let mut source = WordSource::open(file.path(), 10, &mut rng).unwrap();

        let known: Vec<&str> = WORDS.lines().collect();
        for _ in 0..200 {
            if let Some(word) = source.random_word(&mut rng).unwrap() {
                assert!(known.contains(&word.as_str()), "unexpected word {}", word);
            }
        }
    }

    #[test]
    fn test_random_words_has_exact_length() {
        let file = word_file(WORDS.as_bytes());
        let mut rng = StdRng::seed_from_u64(1);
        let mut source = WordSource::open(file.path(), 3, &mut rng).unwrap();

        for n in [1, 5, 20] {
            let phrase = source.random_words(&mut rng, n).unwrap();
            assert_eq!(phrase.split(' ').count(), n);
        }
    }

    #[test]
    fn test_single_line_list_yields_missing_words() {
        // No line follows any offset, so every draw comes back empty
        let file = word_file(b"solitary");
        let mut rng = StdRng::seed_from_u64(2);
        let mut source = WordSource::open(file.path(), 2, &mut rng).unwrap();
        assert_eq!(source.categories(), [MISSING_CATEGORY, MISSING_CATEGORY]);

        let phrase = source.random_words(&mut rng, 4).unwrap();
        assert_eq!(phrase, vec![MISSING_WORD; 4].join(" "));
    }

    #[test]
    fn test_category_pool() {
        let file = word_file(WORDS.as_bytes());
        let mut rng = StdRng::seed_from_u64(3);
        let source = WordSource::open(file.path(), 4, &mut rng).unwrap();

        assert_eq!(source.categories().len(), 4);
        for _ in 0..50 {
            let word = source.random_category_word(&mut rng);
            assert!(source.categories().contains(&word));
        }
    }

    #[test]
    fn test_undecodable_line_becomes_sentinel() {
        let mut content = Vec::new();
        for _ in 0..50 {
            content.extend_from_slice(b"\xff\xfe\n");
        }
        let file = word_file(&content);
        let mut rng = StdRng::seed_from_u64(9);
        let mut source = WordSource::open(file.path(), 1, &mut rng).unwrap();

        for _ in 0..20 {
            if let Some(word) = source.random_word(&mut rng).unwrap() {
                assert_eq!(word, UNDECODABLE_WORD);
            }
        }
    }

    #[test]
    fn test_no_line_boundary_is_fatal() {
        let content = vec![b'x'; 5000];
        let file = word_file(&content);
        let mut rng = StdRng::seed_from_u64(5);
        let result = WordSource::open(file.path(), 1, &mut rng);

        // Offsets near the end hit EOF before the scan limit; retry until one doesn't.
        match result {
            Err(GenerationError::CorruptWordList { limit, .. }) => assert_eq!(limit, MAX_SCAN_BYTES),
            Ok(mut source) => {
                let mut rng = StdRng::seed_from_u64(6);
                let mut saw_error = false;
                for _ in 0..20 {
                    if let Err(GenerationError::CorruptWordList { .. }) =
                        source.random_word(&mut rng)
                    {
                        saw_error = true;
                        break;
                    }
                }
                assert!(saw_error);
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn test_missing_list_is_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = WordSource::open(Path::new("/nonexistent/words"), 1, &mut rng);
        assert!(matches!(result, Err(GenerationError::WordList { .. })));
    }
}
