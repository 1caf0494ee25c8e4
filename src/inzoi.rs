use directories::{BaseDirs, UserDirs};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const GAME_NAME: &str = "inZOI";
const MODS_DIR_NAME: &str = "Mods";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("mod directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },
    #[error("could not resolve the user's profile directory")]
    ProfileUnavailable,
}

/// `<profile>/inZOI/Mods`, whether or not it exists.
pub fn mods_dir_in(profile_dir: &Path) -> PathBuf {
    profile_dir.join(GAME_NAME).join(MODS_DIR_NAME)
}

pub fn locate_in(profile_dir: &Path) -> Result<PathBuf, LocateError> {
    check_mods_dir(mods_dir_in(profile_dir))
}

pub fn locate(override_dir: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = override_dir {
        return check_mods_dir(path.to_path_buf());
    }
    let profile_dir = find_profile_dir().ok_or(LocateError::ProfileUnavailable)?;
    locate_in(&profile_dir)
}

fn check_mods_dir(path: PathBuf) -> Result<PathBuf, LocateError> {
    if looks_like_mods_dir(&path) {
        Ok(path)
    } else {
        Err(LocateError::DirectoryNotFound { path })
    }
}

/// The game keeps its user data under the Documents folder.
fn find_profile_dir() -> Option<PathBuf> {
    let documents = UserDirs::new().and_then(|dirs| dirs.document_dir().map(Path::to_path_buf));
    if documents.is_some() {
        return documents;
    }
    BaseDirs::new().map(|base| base.home_dir().join("Documents"))
}

pub fn looks_like_mods_dir(path: &Path) -> bool {
    path.is_dir()
}
