use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use iafs::client::{ModifyBody, SearchResults};
use iafs::{ArchiveClient, IafsError, Item, MetadataEdit, ModifyResponse, Result};
use tempfile::TempDir;

/// Get the path to the iafs binary for testing.
#[allow(dead_code)]
pub fn get_iafs_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("iafs").to_path_buf()
}

/// In-memory archive that records every call made against it.
///
/// Unknown identifiers come back as empty documents, which is how the service
/// answers for items it does not know. Identifiers in `failing` return a
/// transport error instead.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingClient {
    pub items: HashMap<String, Value>,
    pub failing: HashSet<String>,
    pub search_hits: Vec<String>,
    pub responses: HashMap<String, ModifyResponse>,
    pub get_calls: RefCell<Vec<String>>,
    pub search_calls: RefCell<Vec<String>>,
    pub modify_calls: RefCell<Vec<(String, MetadataEdit)>>,
}

#[allow(dead_code)]
impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, identifier: &str, document: Value) -> Self {
        self.items.insert(identifier.to_string(), document);
        self
    }

    pub fn with_failing(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_string());
        self
    }

    pub fn with_search_hits(mut self, hits: &[&str]) -> Self {
        self.search_hits = hits.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_response(mut self, identifier: &str, status: u16, body: ModifyBody) -> Self {
        self.responses
            .insert(identifier.to_string(), ModifyResponse { status, body });
        self
    }

    pub fn modified_identifiers(&self) -> Vec<String> {
        self.modify_calls
            .borrow()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl ArchiveClient for RecordingClient {
    fn get_item(&self, identifier: &str) -> Result<Item> {
        self.get_calls.borrow_mut().push(identifier.to_string());
        if self.failing.contains(identifier) {
            return Err(IafsError::Http(format!(
                "connection refused while fetching {}",
                identifier
            )));
        }
        let document = self
            .items
            .get(identifier)
            .cloned()
            .unwrap_or_else(|| json!({}));
        Item::from_json(identifier, document)
    }

    fn search_items(&self, query: &str) -> Result<SearchResults> {
        self.search_calls.borrow_mut().push(query.to_string());
        Ok(SearchResults::new(self.search_hits.clone()))
    }

    fn modify_metadata(&self, item: &Item, edit: &MetadataEdit) -> Result<ModifyResponse> {
        self.modify_calls
            .borrow_mut()
            .push((item.identifier.clone(), edit.clone()));

        Ok(self
            .responses
            .get(&item.identifier)
            .cloned()
            .unwrap_or_else(|| ModifyResponse {
                status: 200,
                body: ModifyBody {
                    success: true,
                    log: Some(format!(
                        "https://catalogd.archive.org/log/{}",
                        item.identifier
                    )),
                    error: None,
                },
            }))
    }
}

#[allow(dead_code)]
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Isolated config directory for a single test.
///
/// Holds a process-wide lock while alive so tests that touch environment
/// variables do not interleave.
#[allow(dead_code)]
pub struct TestConfigContext {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

#[allow(dead_code)]
impl TestConfigContext {
    pub fn new() -> Self {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config");

        // Set IAFS_CONFIG_DIR to isolate config from user's real config
        env::set_var("IAFS_CONFIG_DIR", config_dir.to_string_lossy().to_string());
        env::remove_var("IA_ACCESS_KEY");
        env::remove_var("IA_SECRET_KEY");

        Self {
            temp_dir,
            config_dir,
            _guard: guard,
        }
    }

    pub fn write_config(&self, content: &str) {
        std::fs::create_dir_all(&self.config_dir).expect("Failed to create config dir");
        std::fs::write(self.config_dir.join("config.toml"), content)
            .expect("Failed to write config file");
    }
}

impl Drop for TestConfigContext {
    fn drop(&mut self) {
        env::remove_var("IAFS_CONFIG_DIR");
        env::remove_var("IA_ACCESS_KEY");
        env::remove_var("IA_SECRET_KEY");
    }
}
