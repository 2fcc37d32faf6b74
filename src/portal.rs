use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};

use crate::catalogue;
use crate::config::{Credential, Settings};
use crate::content::{FastaEntry, parse_fasta};
use crate::domain::{ArtifactKind, AssemblyId, ProductId};
use crate::download::{DownloadLink, DownloadOptions, DownloadOutcome, DownloadReport, Reconciler};
use crate::error::PortalError;
use crate::http::{ApiRequest, Fetcher, ResponseOutcome};
use crate::paginate::Pages;
use crate::record::{Catalogue, Record, record_id};
use crate::search::{SearchHits, SearchOptions, search_catalogue};
use crate::store::Store;

pub struct PortalClient<F: Fetcher> {
    fetcher: F,
    credential: Credential,
    settings: Settings,
    store: Store,
    catalogue: Option<Catalogue>,
}

impl<F: Fetcher> PortalClient<F> {
    pub fn new(fetcher: F, credential: Credential, settings: Settings, store: Store) -> Self {
        Self {
            fetcher,
            credential,
            settings,
            store,
            catalogue: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.settings.base_url.trim_end_matches('/'))
    }

    pub fn search_product(&self, product: &ProductId) -> Result<Vec<Record>, PortalError> {
        self.search_remote(
            json!({ "product_id": product.as_str() }),
            &format!("product {product}"),
        )
    }

    pub fn search_text(&self, text: &str) -> Result<Vec<Record>, PortalError> {
        self.search_remote(json!({ "text": text }), &format!("text \"{text}\""))
    }

    fn search_remote(&self, body: Value, context: &str) -> Result<Vec<Record>, PortalError> {
        let url = self.url("genomes/search");
        let response = self
            .fetcher
            .fetch(&ApiRequest::post(&url, body).authorized(&self.credential))?;
        let records = match response.check(context) {
            Ok(ResponseOutcome::Empty) | Err(PortalError::NotFound(_)) => Vec::new(),
            Ok(_) => response.decode::<Vec<Record>>(&url)?,
            Err(err) => return Err(err),
        };
        if records.is_empty() {
            tracing::warn!("no assemblies matched {context}");
        }
        Ok(records)
    }

    pub fn first_assembly_for_product(
        &self,
        product: &ProductId,
    ) -> Result<AssemblyId, PortalError> {
        let records = self.search_product(product)?;
        let first = records
            .first()
            .ok_or_else(|| PortalError::EmptyResult(format!("product {product}")))?;
        record_id(first)
            .ok_or_else(|| PortalError::MalformedResponse {
                endpoint: self.url("genomes/search"),
                message: "search result has no id".to_string(),
            })?
            .parse()
    }

    pub fn assembly_ids(records: &[Record]) -> Vec<AssemblyId> {
        records
            .iter()
            .filter_map(record_id)
            .filter_map(|id| id.parse().ok())
            .collect()
    }

    pub fn metadata(&self, id: &AssemblyId) -> Result<Record, PortalError> {
        let url = self.url(&format!("genomes/{id}"));
        let context = format!("assembly {id}");
        let response = self
            .fetcher
            .fetch(&ApiRequest::get(&url).authorized(&self.credential))?;
        if response.check(&context)? == ResponseOutcome::Empty {
            return Err(PortalError::NotFound(context));
        }
        response.decode(&url)
    }

    pub fn link(&self, kind: ArtifactKind, id: &AssemblyId) -> Result<DownloadLink, PortalError> {
        let url = self.url(&format!("genomes/{id}/{}", kind.link_segment()));
        let context = format!("{kind} link for {id}");
        let response = self
            .fetcher
            .fetch(&ApiRequest::get(&url).authorized(&self.credential))?;
        if response.check(&context)? == ResponseOutcome::Empty {
            return Err(PortalError::NotFound(context));
        }
        let raw: Value = response.decode(&url)?;
        DownloadLink::from_json(raw, kind, id, &url)
    }

    pub fn assembly_link(&self, id: &AssemblyId) -> Result<DownloadLink, PortalError> {
        self.link(ArtifactKind::Assembly, id)
    }

    pub fn annotation_link(&self, id: &AssemblyId) -> Result<DownloadLink, PortalError> {
        self.link(ArtifactKind::Annotations, id)
    }

    fn reconciler(&self) -> Reconciler<'_, F> {
        Reconciler::new(
            &self.fetcher,
            self.settings.content_retry,
            self.settings.min_viable_size,
        )
    }

    pub fn fetch_assembly(&self, id: &AssemblyId) -> Result<Vec<FastaEntry>, PortalError> {
        let link = self.assembly_link(id)?;
        let content = self.reconciler().await_content(&link.url)?;
        Ok(parse_fasta(&content))
    }

    pub fn fetch_annotations(&self, id: &AssemblyId) -> Result<String, PortalError> {
        let link = self.annotation_link(id)?;
        self.reconciler().await_content(&link.url)
    }

    pub fn download(
        &self,
        kind: ArtifactKind,
        id: &AssemblyId,
        options: &DownloadOptions,
    ) -> Result<DownloadReport, PortalError> {
        let link = self.link(kind, id)?;
        if options.link_only {
            return Ok(DownloadReport {
                kind,
                assembly_id: id.as_str().to_string(),
                link,
                outcome: DownloadOutcome::LinkOnly,
                path: None,
                version: None,
                previous_version: None,
            });
        }
        let store = match &options.directory {
            Some(dir) => self.store.clone().with_download_dir(dir.clone()),
            None => self.store.clone(),
        };
        self.reconciler()
            .reconcile(kind, id, link, &store, options.force)
    }

    pub fn pages(&self) -> Pages<'_, F> {
        Pages::new(
            &self.fetcher,
            &self.credential,
            self.url("genomes"),
            self.settings.pagination_header.as_str(),
        )
    }

    pub fn build_catalogue(&mut self) -> Result<&Catalogue, PortalError> {
        let built = catalogue::build_catalogue(self.pages())?;
        let built: &Catalogue = self.catalogue.insert(built);
        Ok(built)
    }

    pub fn catalogue_path(&self) -> Utf8PathBuf {
        self.settings
            .catalogue_path
            .clone()
            .unwrap_or_else(|| self.store.default_catalogue_path())
    }

    pub fn cache_catalogue(&mut self, path: Option<&Utf8Path>) -> Result<Utf8PathBuf, PortalError> {
        let target = path
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| self.catalogue_path());
        let built = self.build_catalogue()?;
        catalogue::persist(built, &target)?;
        Ok(target)
    }

    pub fn load_catalogue(&mut self, path: Option<&Utf8Path>) -> Result<&Catalogue, PortalError> {
        let source = path
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| self.catalogue_path());
        let loaded = catalogue::load(&source)?;
        let loaded: &Catalogue = self.catalogue.insert(loaded);
        Ok(loaded)
    }

    pub fn set_catalogue(&mut self, catalogue: Catalogue) {
        self.catalogue = Some(catalogue);
    }

    pub fn catalogue(&self) -> Option<&Catalogue> {
        self.catalogue.as_ref()
    }

    pub fn search_catalogue(
        &self,
        term: &str,
        options: &SearchOptions,
    ) -> Result<SearchHits, PortalError> {
        let catalogue = self.catalogue.as_ref().ok_or_else(|| {
            PortalError::NotFound("catalogue (build or load one before searching)".to_string())
        })?;
        Ok(search_catalogue(
            catalogue,
            term,
            options,
            &self.settings.id_prefix,
        ))
    }
}
