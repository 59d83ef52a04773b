use crate::config::BlockgridConfig;
use crate::error::{BlockError, Result};
use crate::outcome::LoadReport;
use crate::slot::fs::FsSlot;
use crate::store::BlockStore;
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "BLOCKGRID_HOME";

/// Name of a per-project data directory.
pub const LOCAL_DIR: &str = ".blockgrid";

pub struct BlockgridContext {
    pub store: BlockStore<FsSlot>,
    pub config: BlockgridConfig,
    pub data_dir: PathBuf,
    pub load: LoadReport,
    /// Why `config.json` was ignored in favour of defaults, if it was.
    pub config_problem: Option<String>,
}

/// Find a project data directory by walking up from cwd looking for a
/// `.blockgrid` directory. Returns None if none is found before reaching home
/// or the filesystem root.
pub fn find_local_dir(cwd: &Path) -> Option<PathBuf> {
    let home_dir = BaseDirs::new().map(|bd| bd.home_dir().to_path_buf());
    let mut current = cwd.to_path_buf();

    loop {
        let candidate = current.join(LOCAL_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }

        if let Some(ref home) = home_dir {
            if &current == home {
                return None;
            }
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent.to_path_buf();
            }
            _ => return None,
        }
    }
}

/// Picks the data directory: an explicit path, then `$BLOCKGRID_HOME`, then the
/// nearest `.blockgrid` above `cwd`, then the platform data directory.
pub fn resolve_data_dir(
    explicit: Option<&Path>,
    env_dir: Option<PathBuf>,
    cwd: &Path,
) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    if let Some(dir) = find_local_dir(cwd) {
        return Ok(dir);
    }
    let proj_dirs = ProjectDirs::from("com", "blockgrid", "blockgrid").ok_or_else(|| {
        BlockError::Api("Could not determine a data directory; pass --data".to_string())
    })?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// Opens the store in `data_dir` and loads the saved collection.
pub fn initialize(data_dir: PathBuf) -> BlockgridContext {
    let (config, config_problem) = match BlockgridConfig::load(&data_dir) {
        Ok(config) => (config, None),
        Err(e) => {
            tracing::warn!(dir = %data_dir.display(), error = %e, "unusable config, using defaults");
            (BlockgridConfig::default(), Some(e.to_string()))
        }
    };

    let mut store = BlockStore::new(FsSlot::new(&data_dir), config.slot_key.clone())
        .with_defaults(config.block_defaults());
    let load = store.load();
    tracing::debug!(dir = %data_dir.display(), blocks = load.blocks, "initialized");

    BlockgridContext {
        store,
        config,
        data_dir,
        load,
        config_problem,
    }
}
