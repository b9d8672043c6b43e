//! Remote catalog source: the read-only HTTP JSON API and its payload
//! shapes, behind a trait so the loader can be driven by stubs in tests.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default API root (PokeAPI shape).
pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";
/// Page size for the berry list.
pub const BERRY_PAGE_LIMIT: usize = 64;
/// Page size for the species list: the first 386 by national dex.
pub const SPECIES_PAGE_LIMIT: usize = 386;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure to retrieve remote catalog data. Always recovered by the
/// loader, which degrades to cached or built-in data; never fatal.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, decode).
    #[error("http error: {0}")]
    Http(String),
    /// The server answered with a non-2xx status.
    #[error("unexpected status: {0}")]
    Status(u16),
    /// The source is disabled (offline mode).
    #[error("catalog source disabled")]
    Offline,
}

/// A `{name, url}` reference as the API returns inside lists and links.
#[derive(Clone, Debug, Deserialize)]
pub struct NamedRef {
    /// Resource name.
    pub name: String,
    /// Resource url.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct PagedResponse {
    results: Vec<NamedRef>,
}

/// One flavor entry on a berry.
#[derive(Clone, Debug, Deserialize)]
pub struct RawFlavor {
    /// Flavor strength; summed into the happiness delta.
    #[serde(default)]
    pub potency: i64,
}

/// Berry detail payload; the attributes the pricing formula consumes.
#[derive(Clone, Debug, Deserialize)]
pub struct RawBerry {
    /// Berry name, used as the food id.
    pub name: String,
    /// Physical size; drives the satiation delta.
    #[serde(default)]
    pub size: i64,
    /// Growth time; drives the growth price factor.
    #[serde(default)]
    pub growth_time: i64,
    /// Firmness tier reference.
    pub firmness: Option<NamedRef>,
    /// Flavor entries.
    #[serde(default)]
    pub flavors: Vec<RawFlavor>,
    /// The shop item this berry corresponds to.
    pub item: NamedRef,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawItemSprites {
    #[serde(default)]
    default: Option<String>,
}

/// Item detail payload: display name and sprite.
#[derive(Clone, Debug, Deserialize)]
pub struct RawItem {
    /// Item name, pretty-printed into the food label.
    pub name: String,
    #[serde(default)]
    sprites: RawItemSprites,
}

impl RawItem {
    /// Sprite url, empty when the API has none.
    pub fn sprite(&self) -> String {
        self.sprites.default.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct RawPokemonSprites {
    #[serde(default)]
    front_default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPokemon {
    sprites: RawPokemonSprites,
}

#[derive(Debug, Deserialize)]
struct RawSpeciesDetail {
    evolution_chain: Option<UrlRef>,
}

#[derive(Debug, Deserialize)]
struct UrlRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawChain {
    chain: ChainLink,
}

#[derive(Debug, Deserialize)]
struct ChainLink {
    species: NamedRef,
    #[serde(default)]
    evolves_to: Vec<ChainLink>,
}

/// Read-only remote catalog contract: lists and per-entry details, failing
/// on network or HTTP error.
pub trait RemoteSource {
    /// Names of the candidate berries (one page).
    fn berry_names(&self) -> Result<Vec<String>, FetchError>;
    /// Detail for one berry.
    fn berry(&self, name: &str) -> Result<RawBerry, FetchError>;
    /// Detail for the item linked from a berry, by url.
    fn item(&self, url: &str) -> Result<RawItem, FetchError>;
    /// Names of the selectable species (one page).
    fn species_names(&self) -> Result<Vec<String>, FetchError>;
    /// Front sprite url for a species.
    fn sprite(&self, name: &str) -> Result<String, FetchError>;
    /// Next species in the evolution chain, if any.
    fn next_evolution(&self, name: &str) -> Result<Option<String>, FetchError>;
}

/// HTTP implementation over the public API.
pub struct HttpSource {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    /// Source against the default API root.
    pub fn new() -> Self {
        Self::with_base(DEFAULT_API_BASE)
    }

    /// Source against a custom root, for mock servers.
    pub fn with_base(base: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base: base.into(),
            client,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.json().map_err(|e| FetchError::Http(e.to_string()))
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSource for HttpSource {
    fn berry_names(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/berry?limit={}", self.base, BERRY_PAGE_LIMIT);
        let page: PagedResponse = self.get_json(&url)?;
        Ok(page.results.into_iter().map(|r| r.name).collect())
    }

    fn berry(&self, name: &str) -> Result<RawBerry, FetchError> {
        self.get_json(&format!("{}/berry/{name}", self.base))
    }

    fn item(&self, url: &str) -> Result<RawItem, FetchError> {
        self.get_json(url)
    }

    fn species_names(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/pokemon?limit={}", self.base, SPECIES_PAGE_LIMIT);
        let page: PagedResponse = self.get_json(&url)?;
        Ok(page.results.into_iter().map(|r| r.name).collect())
    }

    fn sprite(&self, name: &str) -> Result<String, FetchError> {
        let detail: RawPokemon = self.get_json(&format!("{}/pokemon/{name}", self.base))?;
        Ok(detail.sprites.front_default.unwrap_or_default())
    }

    fn next_evolution(&self, name: &str) -> Result<Option<String>, FetchError> {
        let detail: RawSpeciesDetail =
            self.get_json(&format!("{}/pokemon-species/{name}", self.base))?;
        let Some(chain_ref) = detail.evolution_chain else {
            return Ok(None);
        };
        let graph: RawChain = self.get_json(&chain_ref.url)?;
        Ok(find_next(&graph.chain, name))
    }
}

fn find_next(link: &ChainLink, name: &str) -> Option<String> {
    if link.species.name == name {
        return link.evolves_to.first().map(|l| l.species.name.clone());
    }
    link.evolves_to.iter().find_map(|l| find_next(l, name))
}

/// A source that always fails with [`FetchError::Offline`]; used when the
/// remote is disabled and as the base for test stubs.
pub struct OfflineSource;

impl RemoteSource for OfflineSource {
    fn berry_names(&self) -> Result<Vec<String>, FetchError> {
        Err(FetchError::Offline)
    }

    fn berry(&self, _name: &str) -> Result<RawBerry, FetchError> {
        Err(FetchError::Offline)
    }

    fn item(&self, _url: &str) -> Result<RawItem, FetchError> {
        Err(FetchError::Offline)
    }

    fn species_names(&self) -> Result<Vec<String>, FetchError> {
        Err(FetchError::Offline)
    }

    fn sprite(&self, _name: &str) -> Result<String, FetchError> {
        Err(FetchError::Offline)
    }

    fn next_evolution(&self, _name: &str) -> Result<Option<String>, FetchError> {
        Err(FetchError::Offline)
    }
}
