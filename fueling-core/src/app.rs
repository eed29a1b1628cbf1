//! Application root
//!
//! [`App`] owns the request store and the view selected at startup. Front
//! ends build one with [`App::mount`] and pass its parts by reference to
//! whatever renders them.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{default_data_dir, ViewMode, ViewTiming};
use crate::persistence::{Persistence, PersistenceError};
use crate::storage::FileKeyValueStore;
use crate::store::RequestStore;
use crate::views::{OperatorView, RequesterView};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("mount point {0:?} does not exist or is not a directory")]
    MissingMountPoint(PathBuf),
    #[error("could not determine a data directory for this platform")]
    NoDataDir,
    #[error("failed to create data directory {path:?}: {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Resolves the data directory the application attaches to.
///
/// An explicitly given directory must already exist. The platform default
/// is created when missing.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Some(dir) = explicit {
        if !dir.is_dir() {
            return Err(AppError::MissingMountPoint(dir.to_path_buf()));
        }
        return Ok(dir.to_path_buf());
    }

    let dir = default_data_dir().ok_or(AppError::NoDataDir)?;
    std::fs::create_dir_all(&dir).map_err(|source| AppError::CreateDataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// The role-specific view the app was started with
pub enum ActiveView {
    Requester(RequesterView),
    Operator(OperatorView),
}

impl ActiveView {
    pub fn mode(&self) -> ViewMode {
        match self {
            ActiveView::Requester(_) => ViewMode::Client,
            ActiveView::Operator(_) => ViewMode::Company,
        }
    }
}

pub struct App {
    pub store: RequestStore,
    pub view: ActiveView,
}

impl App {
    /// Attaches to `data_dir`, which must be an existing directory
    pub fn mount(data_dir: &Path, mode: ViewMode, timing: ViewTiming) -> Result<Self, AppError> {
        if !data_dir.is_dir() {
            return Err(AppError::MissingMountPoint(data_dir.to_path_buf()));
        }

        log::info!("Mounting {} view on {:?}", mode, data_dir);
        let persistence = Persistence::new(Box::new(FileKeyValueStore::new(data_dir)));
        Self::with_store(RequestStore::open(persistence), mode, timing)
    }

    /// Builds the app around an already opened store
    pub fn with_store(
        store: RequestStore,
        mode: ViewMode,
        timing: ViewTiming,
    ) -> Result<Self, AppError> {
        let view = match mode {
            ViewMode::Client => {
                let requester_id = store.persistence().get_or_create_requester_id()?;
                ActiveView::Requester(RequesterView::new(requester_id, timing))
            }
            ViewMode::Company => ActiveView::Operator(OperatorView::new()),
        };
        Ok(Self { store, view })
    }

    pub fn mode(&self) -> ViewMode {
        self.view.mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_mount_point_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let result = App::mount(&missing, ViewMode::Client, ViewTiming::immediate());
        assert!(matches!(result, Err(AppError::MissingMountPoint(ref p)) if p == &missing));

        assert!(matches!(
            resolve_data_dir(Some(&missing)),
            Err(AppError::MissingMountPoint(_))
        ));
    }

    #[test]
    fn test_file_is_not_a_mount_point() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();

        assert!(App::mount(&file, ViewMode::Company, ViewTiming::immediate()).is_err());
    }

    #[test]
    fn test_mount_selects_view() {
        let temp_dir = TempDir::new().unwrap();

        let client = App::mount(temp_dir.path(), ViewMode::Client, ViewTiming::immediate()).unwrap();
        assert_eq!(client.mode(), ViewMode::Client);
        let ActiveView::Requester(requester) = &client.view else {
            panic!("expected requester view");
        };
        assert!(!requester.requester_id().is_empty());

        let company = App::mount(temp_dir.path(), ViewMode::Company, ViewTiming::immediate()).unwrap();
        assert_eq!(company.mode(), ViewMode::Company);
        assert_eq!(company.store.requests().len(), 3);
    }

    #[test]
    fn test_requester_id_stable_across_mounts() {
        let temp_dir = TempDir::new().unwrap();
        let id = |app: App| match app.view {
            ActiveView::Requester(view) => view.requester_id().to_string(),
            ActiveView::Operator(_) => panic!("expected requester view"),
        };

        let first = id(App::mount(temp_dir.path(), ViewMode::Client, ViewTiming::immediate()).unwrap());
        let second = id(App::mount(temp_dir.path(), ViewMode::Client, ViewTiming::immediate()).unwrap());

        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_explicit_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_data_dir(Some(temp_dir.path())).unwrap(),
            temp_dir.path().to_path_buf()
        );
    }
}
