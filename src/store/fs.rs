use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{Document, DocumentStore, StagedWrites, Transaction};
use crate::error::{OnboardingError, OnboardingResult};

/// Names the live generation. Absent means nothing was ever committed.
const MANIFEST_FILE: &str = "CURRENT";
const MANIFEST_TEMP: &str = "CURRENT.tmp";

/// Directory-backed store, one document per line.
///
/// Layout:
///
/// ```text
/// <root>/CURRENT                          {"generation": n}
/// <root>/gen-<n>/<collection>.ndjson
/// ```
///
/// A commit builds generation `n + 1` beside the live one: touched collections get their full
/// new content, untouched ones are linked over. Every file and the directory are synced, then
/// `CURRENT` is replaced by a temp-file rename. That rename is the commit point. A commit that
/// fails or dies before it leaves an unreferenced generation directory, which readers never
/// open and the next commit clears.
///
/// Commits within one process are serialized; separate processes writing the same root are not
/// coordinated.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    commit_lock: Mutex<()>,
    #[cfg(test)]
    fail_before_write: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    generation: u64,
}

impl FsStore {
    /// Store rooted at `root`. Nothing is touched until [`DocumentStore::ping`] or a write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            commit_lock: Mutex::new(()),
            #[cfg(test)]
            fail_before_write: None,
        }
    }

    /// Fail every commit just before it writes its `n`th touched collection (0-based).
    #[cfg(test)]
    fn failing_before_write(mut self, n: usize) -> Self {
        self.fail_before_write = Some(n);
        self
    }

    #[cfg(test)]
    fn injected_failure(&self, written: usize) -> OnboardingResult<()> {
        if self.fail_before_write == Some(written) {
            return Err(std::io::Error::other("injected collection write failure").into());
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn injected_failure(&self, _written: usize) -> OnboardingResult<()> {
        Ok(())
    }

    fn collection_file(collection: &str) -> OnboardingResult<String> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !collection.starts_with('.');
        if !valid {
            return Err(OnboardingError::Store {
                message: format!("invalid collection name '{collection}'"),
            });
        }
        Ok(format!("{collection}.ndjson"))
    }

    fn generation_dir(&self, generation: u64) -> PathBuf {
        self.root.join(format!("gen-{generation:06}"))
    }

    fn live_generation(&self) -> OnboardingResult<u64> {
        let path = self.root.join(MANIFEST_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_str(&text).map_err(|e| OnboardingError::Store {
            message: format!("corrupt manifest {}: {e}", path.display()),
        })?;
        Ok(manifest.generation)
    }

    fn read_collection(&self, collection: &str) -> OnboardingResult<Vec<Document>> {
        let file = Self::collection_file(collection)?;
        let mut generation = self.live_generation()?;
        loop {
            if generation == 0 {
                return Ok(Vec::new());
            }
            let path = self.generation_dir(generation).join(&file);
            match fs::read_to_string(&path) {
                Ok(text) => return parse_documents(&path, &text),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    // A concurrent commit may have retired this generation after we read the
                    // manifest.
                    let now = self.live_generation()?;
                    if now == generation {
                        return Ok(Vec::new());
                    }
                    generation = now;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fill `dir` with the complete content of the next generation.
    fn build_generation(
        &self,
        dir: &Path,
        live: Option<&Path>,
        staged: BTreeMap<String, Vec<Document>>,
    ) -> OnboardingResult<()> {
        fs::create_dir_all(dir)?;

        if let Some(live) = live {
            for entry in fs::read_dir(live)? {
                let entry = entry?;
                let name = entry.file_name();
                let touched = name
                    .to_str()
                    .and_then(|n| n.strip_suffix(".ndjson"))
                    .is_some_and(|c| staged.contains_key(c));
                if touched {
                    continue;
                }
                // Committed files are never rewritten in place, so sharing the inode is safe.
                let target = dir.join(&name);
                if fs::hard_link(entry.path(), &target).is_err() {
                    fs::copy(entry.path(), &target)?;
                }
            }
        }

        for (written, (collection, docs)) in staged.into_iter().enumerate() {
            self.injected_failure(written)?;
            let file = Self::collection_file(&collection)?;
            let mut all = self.read_collection(&collection)?;
            all.extend(docs);
            write_documents(&dir.join(file), &all)?;
        }

        sync_dir(dir)
    }

    /// Point `CURRENT` at `generation`: temp file, fsync, rename, fsync the directory.
    fn switch_to(&self, generation: u64) -> OnboardingResult<()> {
        let temp = self.root.join(MANIFEST_TEMP);
        let mut file = File::create(&temp)?;
        serde_json::to_writer(&mut file, &Manifest { generation })?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, self.root.join(MANIFEST_FILE))?;
        sync_dir(&self.root)
    }
}

fn parse_documents(path: &Path, text: &str) -> OnboardingResult<Vec<Document>> {
    let mut docs = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str::<Document>(line).map_err(|e| OnboardingError::Store {
            message: format!("corrupt document at {}:{}: {e}", path.display(), i + 1),
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

fn write_documents(path: &Path, docs: &[Document]) -> OnboardingResult<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    for doc in docs {
        serde_json::to_writer(&mut w, doc)?;
        w.write_all(b"\n")?;
    }
    let file = w.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn sync_dir(dir: &Path) -> OnboardingResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

impl DocumentStore for FsStore {
    fn ping(&self) -> OnboardingResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| OnboardingError::Connection {
            message: format!("{}: {e}", self.root.display()),
        })?;
        if !self.root.is_dir() {
            return Err(OnboardingError::Connection {
                message: format!("{} is not a directory", self.root.display()),
            });
        }
        Ok(())
    }

    fn begin_transaction(&self) -> OnboardingResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(FsTransaction {
            store: self,
            staged: StagedWrites::default(),
        }))
    }

    fn documents(&self, collection: &str) -> OnboardingResult<Vec<Document>> {
        self.read_collection(collection)
    }
}

struct FsTransaction<'a> {
    store: &'a FsStore,
    staged: StagedWrites,
}

impl Transaction for FsTransaction<'_> {
    fn count_documents(&mut self, collection: &str) -> OnboardingResult<u64> {
        let committed = self.store.read_collection(collection)?.len() as u64;
        Ok(committed + self.staged.staged_len(collection))
    }

    fn insert_many(&mut self, collection: &str, documents: Vec<Document>) -> OnboardingResult<usize> {
        let committed = self.store.read_collection(collection)?;
        self.staged.stage(collection, documents, &committed)
    }

    fn commit(self: Box<Self>) -> OnboardingResult<()> {
        let FsTransaction { store, staged } = *self;
        let staged = staged.into_inner();
        if staged.is_empty() {
            return Ok(());
        }

        let _guard = store.commit_lock.lock().map_err(|_| OnboardingError::Store {
            message: "fs store commit lock poisoned".to_string(),
        })?;
        fs::create_dir_all(&store.root)?;

        let live = store.live_generation()?;
        let live_dir = (live > 0).then(|| store.generation_dir(live));
        let next = live + 1;
        let next_dir = store.generation_dir(next);
        if next_dir.exists() {
            // Left behind by a commit that never reached its switch.
            fs::remove_dir_all(&next_dir)?;
        }

        let result = store
            .build_generation(&next_dir, live_dir.as_deref(), staged)
            .and_then(|()| store.switch_to(next));
        if let Err(e) = result {
            if store.live_generation().ok() != Some(next) {
                let _ = fs::remove_dir_all(&next_dir);
                let _ = fs::remove_file(store.root.join(MANIFEST_TEMP));
            }
            return Err(e);
        }

        if let Some(old) = live_dir {
            let _ = fs::remove_dir_all(old);
        }
        Ok(())
    }

    fn abort(self: Box<Self>) -> OnboardingResult<()> {
        Ok(())
    }
}
