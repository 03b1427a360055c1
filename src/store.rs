//! SQLite persistence for the working graph and dataset.

use crate::graph::{GraphDocument, GraphError, GroupedGraph};
use crate::panel::{DataError, PanelDataset, PanelSchema};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Slot used when a caller keeps a single graph and dataset
pub const DEFAULT_SLOT: &str = "current";

/// Error types for the store
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Serialization(serde_json::Error),
    /// Stored graph no longer satisfies the graph invariants
    Graph(GraphError),
    /// Stored or incoming CSV is not a valid panel
    Data(DataError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(err) => write!(f, "Database error: {}", err),
            StoreError::Serialization(err) => write!(f, "Serialization error: {}", err),
            StoreError::Graph(err) => write!(f, "Stored graph is invalid: {}", err),
            StoreError::Data(err) => write!(f, "Stored dataset is invalid: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

impl From<GraphError> for StoreError {
    fn from(err: GraphError) -> Self {
        StoreError::Graph(err)
    }
}

impl From<DataError> for StoreError {
    fn from(err: DataError) -> Self {
        StoreError::Data(err)
    }
}

/// SQLite-backed store of graph documents and raw dataset CSV.
///
/// Each table is keyed by a slot name. Graphs are kept in their JSON document
/// form and datasets as the CSV text they were uploaded as; both are parsed
/// again on load, so every load re-checks the invariants.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a file-backed store.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the schema created.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Creates a store backed by an in-memory database.
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS graphs (
                slot TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS datasets (
                slot TEXT PRIMARY KEY,
                csv TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Stores a graph in `slot`, replacing any previous one
    pub fn save_graph(&self, slot: &str, graph: &GroupedGraph) -> Result<(), StoreError> {
        let document = serde_json::to_string(&graph.to_document())?;
        self.conn.execute(
            "INSERT OR REPLACE INTO graphs (slot, document, saved_at) VALUES (?1, ?2, ?3)",
            params![slot, document, Utc::now()],
        )?;
        log::info!(
            "Saved graph to slot {} ({} groups, {} variables)",
            slot,
            graph.group_count(),
            graph.variable_count()
        );
        Ok(())
    }

    /// Loads the graph in `slot`, or `None` if nothing was saved there
    pub fn load_graph(&self, slot: &str) -> Result<Option<GroupedGraph>, StoreError> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM graphs WHERE slot = ?1",
                [slot],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(json) => {
                let document: GraphDocument = serde_json::from_str(&json)?;
                let graph = GroupedGraph::from_document(&document)?;
                log::debug!("Loaded graph from slot {}", slot);
                Ok(Some(graph))
            }
            None => Ok(None),
        }
    }

    /// Validates CSV as a panel and stores the raw text in `slot`
    ///
    /// # Returns
    /// The parsed dataset; nothing is written if parsing fails.
    pub fn save_dataset_csv(
        &self,
        slot: &str,
        csv: &str,
        schema: &PanelSchema,
    ) -> Result<PanelDataset, StoreError> {
        let dataset = PanelDataset::from_csv_str(csv, schema)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO datasets (slot, csv, saved_at) VALUES (?1, ?2, ?3)",
            params![slot, csv, Utc::now()],
        )?;
        log::info!(
            "Saved dataset to slot {} ({} rows, {} variables)",
            slot,
            dataset.len(),
            dataset.variables().len()
        );
        Ok(dataset)
    }

    /// Loads and parses the dataset in `slot`
    pub fn load_dataset(
        &self,
        slot: &str,
        schema: &PanelSchema,
    ) -> Result<Option<PanelDataset>, StoreError> {
        let csv: Option<String> = self
            .conn
            .query_row("SELECT csv FROM datasets WHERE slot = ?1", [slot], |row| {
                row.get(0)
            })
            .optional()?;

        match csv {
            Some(csv) => {
                let dataset = PanelDataset::from_csv_str(&csv, schema)?;
                log::debug!("Loaded dataset from slot {} ({} rows)", slot, dataset.len());
                Ok(Some(dataset))
            }
            None => Ok(None),
        }
    }

    pub fn has_graph(&self, slot: &str) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM graphs WHERE slot = ?1")?;
        Ok(stmt.exists([slot])?)
    }

    pub fn has_dataset(&self, slot: &str) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM datasets WHERE slot = ?1")?;
        Ok(stmt.exists([slot])?)
    }

    /// When the graph in `slot` was last saved
    pub fn graph_saved_at(&self, slot: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT saved_at FROM graphs WHERE slot = ?1",
                [slot],
                |row| row.get(0),
            )
            .optional()?)
    }

    #[cfg(test)]
    fn table_exists(&self, table_name: &str) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
        Ok(stmt.exists([table_name])?)
    }
}
