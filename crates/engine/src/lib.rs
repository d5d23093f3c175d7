#![forbid(unsafe_code)]

mod support;
pub mod wire;

use pt_core::ids::UserId;
use pt_core::popularity::PopularityWeights;
use pt_storage::{
    SpeciesCreateRequest, SpeciesPatch, SqliteStore, StoreError, TreeListRequest,
};
use std::collections::HashMap;

/// Maps an opaque caller token to an identity. Token issuance and validation
/// live with the external auth collaborator; the engine only consumes the
/// resolution.
pub trait CallerResolver {
    fn resolve(&self, token: &str) -> Option<UserId>;
}

/// In-memory token table. Suitable for tests and local tooling.
#[derive(Debug, Default)]
pub struct TokenTable {
    tokens: HashMap<String, UserId>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, user: UserId) {
        self.tokens.insert(token.into(), user);
    }
}

impl CallerResolver for TokenTable {
    fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).cloned()
    }
}

/// Stores image bytes and hands back a resolvable URL; only that URL is
/// persisted with the species record.
pub trait ImageStore {
    fn store(&mut self, bytes: &[u8]) -> Result<String, ImageStoreError>;
    fn delete(&mut self, url: &str) -> Result<(), ImageStoreError>;
}

#[derive(Debug)]
pub struct ImageStoreError(pub String);

impl std::fmt::Display for ImageStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image store: {}", self.0)
    }
}

impl std::error::Error for ImageStoreError {}

/// In-memory image store for tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    next: u64,
    stored: HashMap<String, Vec<u8>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.stored.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }
}

impl ImageStore for MemoryImageStore {
    fn store(&mut self, bytes: &[u8]) -> Result<String, ImageStoreError> {
        self.next += 1;
        let url = format!("mem://images/img_{:06}", self.next);
        self.stored.insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    fn delete(&mut self, url: &str) -> Result<(), ImageStoreError> {
        self.stored.remove(url);
        Ok(())
    }
}

#[derive(Debug)]
pub enum EngineError {
    Store(StoreError),
    Image(ImageStoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Image(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ImageStoreError> for EngineError {
    fn from(value: ImageStoreError) -> Self {
        Self::Image(value)
    }
}

/// The call-contract surface consumed by the transport layer: species tree
/// operations plus the ranked tree listing, with tokens resolved at this
/// boundary and record access checks below it.
pub struct Engine {
    store: SqliteStore,
    resolver: Box<dyn CallerResolver>,
    images: Box<dyn ImageStore>,
    weights: PopularityWeights,
}

impl Engine {
    pub fn new(
        store: SqliteStore,
        resolver: Box<dyn CallerResolver>,
        images: Box<dyn ImageStore>,
    ) -> Self {
        Self {
            store,
            resolver,
            images,
            weights: PopularityWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: PopularityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    fn caller(&self, token: Option<&str>) -> Option<UserId> {
        token.and_then(|token| self.resolver.resolve(token))
    }

    pub fn create_species(
        &mut self,
        tree_id: &str,
        token: Option<&str>,
        request: SpeciesCreateRequest,
    ) -> Result<wire::SpeciesNode, EngineError> {
        let caller = self.caller(token);
        let node = self
            .store
            .species_create(tree_id, caller.as_ref(), request)?;
        Ok(node.into())
    }

    pub fn get_species(
        &mut self,
        tree_id: &str,
        id: &str,
        token: Option<&str>,
    ) -> Result<wire::SpeciesNode, EngineError> {
        let caller = self.caller(token);
        let node = self.store.species_get(tree_id, id, caller.as_ref())?;
        Ok(node.into())
    }

    /// Every root of the tree's forest, each fully nested.
    pub fn get_ph_tree_species(
        &mut self,
        tree_id: &str,
        token: Option<&str>,
    ) -> Result<Vec<wire::SpeciesNode>, EngineError> {
        let caller = self.caller(token);
        let roots = self.store.species_roots(tree_id, caller.as_ref())?;
        Ok(roots.into_iter().map(Into::into).collect())
    }

    pub fn update_species(
        &mut self,
        tree_id: &str,
        id: &str,
        token: Option<&str>,
        patch: SpeciesPatch,
    ) -> Result<wire::SpeciesNode, EngineError> {
        let caller = self.caller(token);
        let node = self
            .store
            .species_update(tree_id, id, caller.as_ref(), patch)?;
        Ok(node.into())
    }

    pub fn delete_species(
        &mut self,
        tree_id: &str,
        id: &str,
        token: Option<&str>,
    ) -> Result<(), EngineError> {
        let caller = self.caller(token);
        self.store.species_delete(tree_id, id, caller.as_ref())?;
        Ok(())
    }

    pub fn set_species_image(
        &mut self,
        tree_id: &str,
        id: &str,
        token: Option<&str>,
        bytes: &[u8],
    ) -> Result<wire::SpeciesNode, EngineError> {
        let caller = self.caller(token);
        let url = self.images.store(bytes)?;
        // The store call may still refuse (missing tree, missing species,
        // access); release the freshly minted URL instead of orphaning it.
        match self
            .store
            .species_set_image(tree_id, id, caller.as_ref(), Some(&url))
        {
            Ok((node, previous)) => {
                if let Some(previous) = previous {
                    self.images.delete(&previous)?;
                }
                Ok(node.into())
            }
            Err(err) => {
                self.images.delete(&url)?;
                Err(err.into())
            }
        }
    }

    pub fn delete_species_image(
        &mut self,
        tree_id: &str,
        id: &str,
        token: Option<&str>,
    ) -> Result<wire::SpeciesNode, EngineError> {
        let caller = self.caller(token);
        let (node, previous) = self
            .store
            .species_set_image(tree_id, id, caller.as_ref(), None)?;
        if let Some(previous) = previous {
            self.images.delete(&previous)?;
        }
        Ok(node.into())
    }

    pub fn list_trees(
        &mut self,
        request: TreeListRequest,
        token: Option<&str>,
    ) -> Result<wire::TreeListPage, EngineError> {
        let caller = self.caller(token);
        let page = self
            .store
            .trees_list(request, caller.as_ref(), &self.weights)?;
        Ok(page.into())
    }

    pub fn tree_popularity(&mut self, tree_id: &str, now_ms: i64) -> Result<f64, EngineError> {
        Ok(self.store.tree_popularity(tree_id, now_ms, &self.weights)?)
    }
}
