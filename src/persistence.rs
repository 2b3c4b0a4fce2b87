use crate::chunking::ChunkedDocument;
use crate::errors::{AssistantError, Result};
use crate::similarity_search::VectorIndex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `metadata_{id}.json` next to every index database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub dataset_id: String,
    pub embedding_model: String,
    pub index_id: String,
    pub creation_date: String,
    #[serde(default)]
    pub dimension: usize,
    #[serde(default)]
    pub document_count: usize,
    pub files: BTreeMap<String, String>,
}

/// An index loaded back into memory
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub metadata: IndexMetadata,
    pub index: VectorIndex,
    pub documents: Vec<ChunkedDocument>,
}

/// Directory of saved indexes
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database_file(index_id: &str) -> String {
        format!("index_{}.db", index_id)
    }

    fn metadata_file(index_id: &str) -> String {
        format!("metadata_{}.json", index_id)
    }

    /// Write documents and their vectors under a fresh index id and return the metadata
    pub fn save_index(
        &self,
        documents: &[ChunkedDocument],
        embeddings: &[Vec<f32>],
        embedding_model: &str,
    ) -> Result<IndexMetadata> {
        if documents.len() != embeddings.len() {
            return Err(crate::validation_error!(
                "embeddings",
                embeddings.len(),
                format!("{} (one per document)", documents.len())
            ));
        }
        let dimension = embeddings
            .first()
            .map(|e| e.len())
            .ok_or_else(|| crate::vector_error!("refusing to save an empty index"))?;
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(crate::validation_error!("vector dimension", bad.len(), dimension));
        }

        std::fs::create_dir_all(&self.root)?;
        let index_id = uuid::Uuid::new_v4().to_string();

        let db_path = self.root.join(Self::database_file(&index_id));
        let mut conn = Connection::open(&db_path)?;
        create_tables(&conn)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (position, description, source, vector) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, (doc, vector)) in documents.iter().zip(embeddings).enumerate() {
                let vector_bytes = bincode::serialize(vector)?;
                stmt.execute(params![position as i64, doc.description, doc.source, vector_bytes])?;
            }
        }
        tx.commit()?;
        log::info!("Saved {} documents to {}", documents.len(), db_path.display());

        let mut files = BTreeMap::new();
        files.insert(
            "index".to_string(),
            self.root.join(Self::database_file(&index_id)).display().to_string(),
        );

        let metadata = IndexMetadata {
            dataset_id: index_id.clone(),
            embedding_model: embedding_model.to_string(),
            index_id: index_id.clone(),
            creation_date: chrono::Local::now().to_rfc3339(),
            dimension,
            document_count: documents.len(),
            files,
        };

        let metadata_path = self.root.join(Self::metadata_file(&index_id));
        std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;
        log::info!("Saved metadata to {}", metadata_path.display());

        Ok(metadata)
    }

    /// Every readable metadata file, newest first. Unreadable files are skipped.
    pub fn load_all_metadata(&self) -> Result<Vec<IndexMetadata>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut all = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !(name.starts_with("metadata_") && name.ends_with(".json")) {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(AssistantError::from)
                .and_then(|s| serde_json::from_str::<IndexMetadata>(&s).map_err(AssistantError::from))
            {
                Ok(metadata) => all.push(metadata),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        all.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(all)
    }

    /// Metadata of `dataset_id` when given and present, else the newest index
    pub fn select_metadata(&self, dataset_id: Option<&str>) -> Result<IndexMetadata> {
        let all = self.load_all_metadata()?;
        let chosen = dataset_id
            .and_then(|id| all.iter().find(|m| m.dataset_id == id).cloned())
            .or_else(|| all.first().cloned());
        chosen.ok_or_else(|| {
            AssistantError::IndexNotFound("No embeddings found. Please run create_index first.".to_string())
        })
    }

    pub fn load_index(&self, metadata: &IndexMetadata) -> Result<LoadedIndex> {
        let db_path = self.root.join(Self::database_file(&metadata.index_id));
        if !db_path.exists() {
            return Err(AssistantError::IndexNotFound(format!(
                "Failed to load embeddings. Missing {}",
                db_path.display()
            )));
        }
        let conn = Connection::open(&db_path)?;

        let mut stmt = conn.prepare("SELECT description, source, vector FROM documents ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            let vector_bytes: Vec<u8> = row.get(2)?;
            let vector: Vec<f32> = bincode::deserialize(&vector_bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Blob, Box::new(e))
            })?;
            Ok((
                ChunkedDocument {
                    description: row.get(0)?,
                    source: row.get(1)?,
                },
                vector,
            ))
        })?;

        let mut documents = Vec::new();
        let mut vectors = Vec::new();
        for row in rows {
            let (doc, vector) = row?;
            documents.push(doc);
            vectors.push(vector);
        }

        let index = VectorIndex::from_rows(vectors)?;
        log::info!(
            "Loaded index {} ({} documents, dimension {})",
            metadata.index_id,
            index.len(),
            index.dimension()
        );

        Ok(LoadedIndex {
            metadata: metadata.clone(),
            index,
            documents,
        })
    }
}

fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            position INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            source TEXT NOT NULL,
            vector BLOB NOT NULL
        )",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<ChunkedDocument> {
        vec![
            ChunkedDocument {
                description: "Event: Jurmala White: Shabalov Moves: e2e4".to_string(),
                source: "jurmala.pgn".to_string(),
            },
            ChunkedDocument {
                description: "Event: Senior White: Tal Moves: d2d4".to_string(),
                source: "senior.pgn".to_string(),
            },
        ]
    }

    #[test]
    fn test_save_and_load_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());

        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let metadata = store.save_index(&docs(), &embeddings, "text-embedding-3-large").unwrap();
        assert_eq!(metadata.dataset_id, metadata.index_id);
        assert_eq!(metadata.dimension, 2);
        assert_eq!(metadata.document_count, 2);

        let all = store.load_all_metadata().unwrap();
        assert_eq!(all, vec![metadata.clone()]);

        let loaded = store.load_index(&metadata).unwrap();
        assert_eq!(loaded.documents, docs());
        assert_eq!(loaded.index.len(), 2);
        let hits = loaded.index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(loaded.documents[hits[0].index].source, "senior.pgn");
    }

    #[test]
    fn test_select_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("embeddings"));

        let err = store.select_metadata(None).unwrap_err();
        assert!(err.to_string().contains("No embeddings found"));

        let first = store.save_index(&docs(), &[vec![1.0], vec![2.0]], "m").unwrap();
        let chosen = store.select_metadata(Some(&first.dataset_id)).unwrap();
        assert_eq!(chosen.index_id, first.index_id);

        // unknown id falls back to the newest index
        let fallback = store.select_metadata(Some("missing")).unwrap();
        assert_eq!(fallback.index_id, first.index_id);
    }

    #[test]
    fn test_save_index_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        assert!(store.save_index(&docs(), &[vec![1.0]], "m").is_err());
        assert!(store.save_index(&docs(), &[vec![1.0], vec![1.0, 2.0]], "m").is_err());
        assert!(store.save_index(&[], &[], "m").is_err());
    }

    #[test]
    fn test_corrupt_metadata_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metadata_broken.json"), "{not json").unwrap();
        let store = IndexStore::new(dir.path());
        assert!(store.load_all_metadata().unwrap().is_empty());
    }
}
