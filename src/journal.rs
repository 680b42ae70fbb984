// =============================================================================
// CLAIM LEDGER — journal.rs
// =============================================================================
//
// Durable backing for the chain: one JSON-encoded block per line, appended
// before the registry commits the matching entity change. Entities are never
// stored separately; they are rebuilt by replaying block payloads.
// =============================================================================

use crate::chain::Block;
use crate::error::{LedgerError, LedgerResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait Journal: Send + Sync {
    /// Persist one block. An error means the block must not be committed.
    fn append(&mut self, block: &Block) -> LedgerResult<()>;

    /// Every persisted block, in append order.
    fn load(&self) -> LedgerResult<Vec<Block>>;

    fn describe(&self) -> String;
}

// -----------------------------------------------------------------------------
// MemoryJournal
// -----------------------------------------------------------------------------

/// No durability: state lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryJournal;

impl Journal for MemoryJournal {
    fn append(&mut self, _block: &Block) -> LedgerResult<()> {
        Ok(())
    }

    fn load(&self) -> LedgerResult<Vec<Block>> {
        Ok(Vec::new())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// -----------------------------------------------------------------------------
// FileJournal
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: File,
}

impl FileJournal {
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let journal = FileJournal { path, file };
        journal.drop_torn_tail()?;
        Ok(journal)
    }

    /// Cut the file back to its last complete line so the next append
    /// starts on a fresh line instead of extending a torn record.
    fn drop_torn_tail(&self) -> LedgerResult<()> {
        let bytes = std::fs::read(&self.path)?;
        let keep = complete_prefix_len(&bytes);
        if keep < bytes.len() as u64 {
            log::warn!(
                "⚠️ Journal {}: truncating {} byte(s) of torn trailing record",
                self.path.display(),
                bytes.len() as u64 - keep
            );
            self.file.set_len(keep)?;
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

/// Length of `bytes` up to and including the last newline.
fn complete_prefix_len(bytes: &[u8]) -> u64 {
    bytes.iter().rposition(|b| *b == b'\n').map(|i| i as u64 + 1).unwrap_or(0)
}

impl Journal for FileJournal {
    fn append(&mut self, block: &Block) -> LedgerResult<()> {
        let mut line = serde_json::to_vec(block)?;
        line.push(b'\n');
        let before = self.file.metadata()?.len();
        if let Err(e) = self.write_line(&line) {
            // an uncommitted block must not survive in the file
            if let Err(undo) = self.file.set_len(before) {
                log::error!("❌ Journal {}: rollback after failed append failed: {}", self.path.display(), undo);
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn load(&self) -> LedgerResult<Vec<Block>> {
        let text = std::fs::read_to_string(&self.path)?;
        parse_lines(&text)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// A last line without its newline is a torn append and is dropped; any
/// other unreadable line is corruption.
fn parse_lines(text: &str) -> LedgerResult<Vec<Block>> {
    let complete = text.ends_with('\n');
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::with_capacity(lines.len());
    for (n, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Block>(line) {
            Ok(block) => blocks.push(block),
            Err(e) if n + 1 == lines.len() && !complete => {
                log::warn!("⚠️ Journal: dropping torn trailing record ({})", e);
            }
            Err(e) => {
                return Err(LedgerError::ChainCorrupted {
                    index: blocks.len() as u64,
                    reason: format!("journal line {}: {}", n + 1, e),
                });
            }
        }
    }
    Ok(blocks)
}
