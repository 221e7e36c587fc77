//! Flat inner-product vector index with a parallel metadata list.
//!
//! Vectors are L2-normalized on the way in, so the inner product between a
//! stored vector and a normalized query is their cosine similarity. Search is
//! exact: every stored vector is scored.
//!
//! State lives in two files that are always written together:
//!
//! * the index file (`MBFI` header, then little-endian `f32` rows)
//! * the metadata file (JSON array, one record per row, same order)
//!
//! The store only supports wholesale rebuilds. Each file is replaced through a
//! temp file and a rename, so a crash leaves either the old or the new copy of
//! that file on disk, never a torn one.

use mapbot_common::{ChunkMetadata, MapbotError, Result, SearchHit};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_INDEX_PATH: &str = "index.bin";
pub const DEFAULT_METADATA_PATH: &str = "metadata.json";

const INDEX_MAGIC: &[u8; 4] = b"MBFI";
const INDEX_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Exact nearest-neighbor index over unit-length rows.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    pub fn empty(dimension: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dimension)),
        }
    }

    /// Takes ownership of `vectors` and normalizes every row in place.
    pub fn from_vectors(mut vectors: Array2<f32>) -> Self {
        for mut row in vectors.axis_iter_mut(Axis(0)) {
            let normalized = normalize(row.view());
            row.assign(&normalized);
        }
        Self { vectors }
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns up to `k` `(position, score)` pairs, best first.
    ///
    /// `query` must already be normalized. Equal scores keep index order.
    pub fn search(&self, query: ArrayView1<f32>, k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(MapbotError::InvalidArgument("k must be positive".to_string()));
        }
        if query.len() != self.dimension() {
            return Err(MapbotError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let scores = self.vectors.dot(&query);
        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();

        let by_score = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));
        if k < ranked.len() {
            ranked.select_nth_unstable_by(k - 1, by_score);
            ranked.truncate(k);
        }
        ranked.sort_by(by_score);
        Ok(ranked)
    }

    fn write_to(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_all(INDEX_MAGIC)?;
        writer.write_all(&INDEX_VERSION.to_le_bytes())?;
        writer.write_all(&(self.dimension() as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        for value in self.vectors.iter() {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(MapbotError::CorruptIndex(format!(
                "file is {} bytes, shorter than the header",
                bytes.len()
            )));
        }
        if &bytes[0..4] != INDEX_MAGIC {
            return Err(MapbotError::CorruptIndex("bad magic".to_string()));
        }

        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != INDEX_VERSION {
            return Err(MapbotError::CorruptIndex(format!(
                "unsupported format version {}",
                version
            )));
        }

        let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[12..20]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let payload = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| MapbotError::CorruptIndex("header size overflow".to_string()))?;
        if payload.len() != expected {
            return Err(MapbotError::CorruptIndex(format!(
                "expected {} payload bytes for {} x {}, found {}",
                expected,
                count,
                dimension,
                payload.len()
            )));
        }

        let values: Vec<f32> = payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let vectors = Array2::from_shape_vec((count, dimension), values)
            .map_err(|e| MapbotError::CorruptIndex(e.to_string()))?;

        Ok(Self { vectors })
    }
}

/// Scales `vector` to unit L2 norm. Zero or non-finite input maps to zeros.
pub fn normalize(vector: ArrayView1<f32>) -> Array1<f32> {
    let norm = vector.dot(&vector).sqrt();
    if norm.is_finite() && norm > 0.0 {
        vector.mapv(|v| v / norm)
    } else {
        Array1::zeros(vector.len())
    }
}

#[derive(Debug, Clone)]
struct StoreState {
    index: FlatIndex,
    metadata: Vec<ChunkMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub vectors: usize,
    pub metadata: usize,
    pub dimension: usize,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Persisted similarity index plus the metadata for each indexed vector.
#[derive(Debug)]
pub struct VectorStore {
    index_path: PathBuf,
    metadata_path: PathBuf,
    dimension: usize,
    state: OnceCell<StoreState>,
}

impl VectorStore {
    pub fn new(
        index_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        dimension: usize,
    ) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
            dimension,
            state: OnceCell::new(),
        }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self::new(DEFAULT_INDEX_PATH, DEFAULT_METADATA_PATH, dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn is_loaded(&self) -> bool {
        self.state.get().is_some()
    }

    /// Number of vectors held in memory. Zero until built or loaded.
    pub fn len(&self) -> usize {
        self.state.get().map_or(0, |state| state.index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata held in memory, in index order.
    pub fn metadata(&self) -> &[ChunkMetadata] {
        self.state
            .get()
            .map(|state| state.metadata.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces the whole index and metadata list, then persists both.
    pub fn build(&mut self, vectors: Array2<f32>, metadatas: Vec<ChunkMetadata>) -> Result<()> {
        if vectors.ncols() != self.dimension {
            return Err(MapbotError::DimensionMismatch {
                expected: self.dimension,
                actual: vectors.ncols(),
            });
        }
        if vectors.nrows() != metadatas.len() {
            return Err(MapbotError::LengthMismatch {
                vectors: vectors.nrows(),
                metadata: metadatas.len(),
            });
        }

        let index = FlatIndex::from_vectors(vectors);
        info!(
            "Building index with {} vectors of dimension {}",
            index.len(),
            self.dimension
        );

        self.state = OnceCell::with_value(StoreState {
            index,
            metadata: metadatas,
        });
        self.save()
    }

    /// Top-`k` matches for every query row, best first.
    ///
    /// Returns an empty list when the store has nothing indexed. Matches whose
    /// position has no metadata record are skipped.
    pub fn search(&self, queries: ArrayView2<f32>, k: usize) -> Result<Vec<Vec<SearchHit>>> {
        if k == 0 {
            return Err(MapbotError::InvalidArgument("k must be positive".to_string()));
        }

        let state = self.ensure_loaded()?;
        if state.index.is_empty() {
            debug!("Search on empty index");
            return Ok(Vec::new());
        }
        if queries.ncols() != self.dimension {
            return Err(MapbotError::DimensionMismatch {
                expected: self.dimension,
                actual: queries.ncols(),
            });
        }

        queries
            .axis_iter(Axis(0))
            .map(|query| -> Result<Vec<SearchHit>> {
                let query = normalize(query);
                let hits = state
                    .index
                    .search(query.view(), k)?
                    .into_iter()
                    .filter_map(|(position, score)| match state.metadata.get(position) {
                        Some(metadata) => Some(SearchHit {
                            score,
                            metadata: metadata.clone(),
                        }),
                        None => {
                            debug!("Skipping hit {} with no metadata record", position);
                            None
                        }
                    })
                    .collect();
                Ok(hits)
            })
            .collect()
    }

    /// Single-query convenience over [`VectorStore::search`].
    pub fn search_one(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let queries = ArrayView2::from_shape((1, query.len()), query)
            .map_err(|e| MapbotError::Internal(e.to_string()))?;
        Ok(self.search(queries, k)?.into_iter().next().unwrap_or_default())
    }

    /// Writes index then metadata. Hydrates from disk first if nothing is in memory.
    pub fn save(&self) -> Result<()> {
        let state = self.ensure_loaded()?;

        write_atomically(&self.index_path, |writer| {
            state
                .index
                .write_to(writer)
                .map_err(|e| MapbotError::io(&self.index_path, e))
        })?;
        write_atomically(&self.metadata_path, |writer| {
            serde_json::to_writer_pretty(&mut *writer, &state.metadata)?;
            writer
                .flush()
                .map_err(|e| MapbotError::io(&self.metadata_path, e))
        })?;

        info!(
            "Saved {} vectors to {} and {} metadata records to {}",
            state.index.len(),
            self.index_path.display(),
            state.metadata.len(),
            self.metadata_path.display()
        );
        Ok(())
    }

    /// Reads both files, replacing whatever is in memory. Missing files are empty.
    pub fn load(&mut self) -> Result<()> {
        let state = self.read_state()?;
        self.state = OnceCell::with_value(state);
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let state = self.ensure_loaded()?;
        Ok(StoreStats {
            vectors: state.index.len(),
            metadata: state.metadata.len(),
            dimension: self.dimension,
            index_path: self.index_path.clone(),
            metadata_path: self.metadata_path.clone(),
        })
    }

    fn ensure_loaded(&self) -> Result<&StoreState> {
        self.state.get_or_try_init(|| self.read_state())
    }

    fn read_state(&self) -> Result<StoreState> {
        let metadata: Vec<ChunkMetadata> = if self.metadata_path.exists() {
            let file = File::open(&self.metadata_path)
                .map_err(|e| MapbotError::io(&self.metadata_path, e))?;
            serde_json::from_reader(BufReader::new(file))?
        } else {
            debug!("No metadata file at {}", self.metadata_path.display());
            Vec::new()
        };

        let index = if self.index_path.exists() {
            let bytes = std::fs::read(&self.index_path)
                .map_err(|e| MapbotError::io(&self.index_path, e))?;
            let index = FlatIndex::from_bytes(&bytes)?;
            if index.dimension() != self.dimension {
                return Err(MapbotError::DimensionMismatch {
                    expected: self.dimension,
                    actual: index.dimension(),
                });
            }
            index
        } else {
            debug!("No index file at {}", self.index_path.display());
            FlatIndex::empty(self.dimension)
        };

        if !index.is_empty() && index.len() != metadata.len() {
            warn!(
                "Index holds {} vectors but metadata has {} records",
                index.len(),
                metadata.len()
            );
        }

        info!(
            "Loaded {} vectors and {} metadata records",
            index.len(),
            metadata.len()
        );
        Ok(StoreState { index, metadata })
    }
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| MapbotError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(&mut temp);
        write(&mut writer)?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| MapbotError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| MapbotError::io(path, e.error))?;
    Ok(())
}
