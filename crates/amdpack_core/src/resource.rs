use log::trace;
use std::{io, sync::Arc};
use tokio::sync::OnceCell;

use crate::{adapter::Adapter, error::ResourceIoError};

/// A named, lazily loaded handle into a pool's virtual namespace.
#[derive(Debug)]
pub enum Resource {
    /// Owned by the project that enumerated it
    File(FileResource),
    /// Forwards to a resource owned by another project
    Locator(LocatorResource),
}

#[derive(Debug)]
pub struct FileResource {
    path: String,
    project: String,
    adapter: Arc<dyn Adapter>,
    content: OnceCell<Arc<[u8]>>,
}

#[derive(Debug)]
pub struct LocatorResource {
    path: String,
    project: String,
    target: Arc<Resource>,
}

impl FileResource {
    async fn load(&self) -> Result<Arc<[u8]>, ResourceIoError> {
        // Concurrent callers wait for the in-flight fetch. A failed fetch leaves the cell empty.
        let content = self
            .content
            .get_or_try_init(|| async {
                trace!("Fetching {} from project {}", self.path, self.project);
                self.adapter
                    .read(&self.path)
                    .await
                    .map(Arc::<[u8]>::from)
                    .map_err(|source| ResourceIoError { path: self.path.clone(), source })
            })
            .await?;
        Ok(Arc::clone(content))
    }
}

impl Resource {
    pub fn file(
        path: impl Into<String>,
        project: impl Into<String>,
        adapter: Arc<dyn Adapter>,
    ) -> Self {
        Resource::File(FileResource {
            path: path.into(),
            project: project.into(),
            adapter,
            content: OnceCell::new(),
        })
    }

    /// Presents `target` as `path` of `project` without copying its content.
    pub fn locator(
        path: impl Into<String>,
        project: impl Into<String>,
        target: Arc<Resource>,
    ) -> Self {
        Resource::Locator(LocatorResource { path: path.into(), project: project.into(), target })
    }

    pub fn path(&self) -> &str {
        match self {
            Resource::File(f) => &f.path,
            Resource::Locator(l) => &l.path,
        }
    }

    pub fn project(&self) -> &str {
        match self {
            Resource::File(f) => &f.project,
            Resource::Locator(l) => &l.project,
        }
    }

    pub fn is_locator(&self) -> bool {
        matches!(self, Resource::Locator(_))
    }

    /// The resource that actually owns the content.
    pub fn origin(&self) -> &FileResource {
        match self {
            Resource::File(f) => f,
            Resource::Locator(l) => l.target.origin(),
        }
    }

    /// Project that physically holds the content.
    pub fn origin_project(&self) -> &str {
        &self.origin().project
    }

    pub fn is_loaded(&self) -> bool {
        self.origin().content.initialized()
    }

    pub async fn content(&self) -> Result<Arc<[u8]>, ResourceIoError> {
        self.origin().load().await
    }

    pub async fn text(&self) -> Result<String, ResourceIoError> {
        let bytes = self.content().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ResourceIoError {
            path: self.path().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })
    }

    pub async fn len(&self) -> Result<usize, ResourceIoError> {
        Ok(self.content().await?.len())
    }
}
