use super::types::{Config, StoredSession};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_slice, to_string_pretty};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const CONFIG_PATH: &str = "config.json";
const SESSION_PATH: &str = "session.json";
const CONFIG_DIR_ENV: &str = "TALKBOARD_CONFIG_DIR";

/// Configuration and the stored sign in session, both backed by json files
#[derive(Clone)]
pub struct Repository {
    directory: PathBuf,
    config: Arc<Mutex<Config>>,
    session: Arc<Mutex<Option<StoredSession>>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("directory", &self.directory)
            .finish()
    }
}

impl Repository {
    pub fn new() -> Result<Self, String> {
        Self::with_directory(data_directory()?)
    }

    pub fn with_directory(directory: impl Into<PathBuf>) -> Result<Self, String> {
        let directory = directory.into();
        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| format!("Could not create directory {}: {e:?}", directory.display()))?;
        }

        let config: Option<Config> = read(&directory, CONFIG_PATH)?;
        let config = match config {
            Some(config) => config,
            None => {
                // Write the defaults so there is something to edit
                let config = Config::default();
                write(&directory, CONFIG_PATH, &config)?;
                log::info!(
                    "Wrote default configuration to {}",
                    directory.join(CONFIG_PATH).display()
                );
                config
            }
        };
        let session = read(&directory, SESSION_PATH).unwrap_or_else(|e| {
            log::error!("Ignoring stored session: {e}");
            None
        });

        Ok(Self {
            directory,
            config: Arc::new(Mutex::new(config)),
            session: Arc::new(Mutex::new(session)),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn config(&self) -> Result<Config, String> {
        Ok(self
            .config
            .lock()
            .map_err(|e| format!("Config Data Error: {e:?}"))?
            .clone())
    }

    pub fn session(&self) -> Result<Option<StoredSession>, String> {
        Ok(self
            .session
            .lock()
            .map_err(|e| format!("Session Data Error: {e:?}"))?
            .clone())
    }

    /// The token to send along with backend requests, if somebody is signed in
    pub fn id_token(&self) -> Option<String> {
        self.session
            .lock()
            .ok()?
            .as_ref()
            .map(|session| session.id_token.clone())
    }

    pub fn set_session(&self, session: Option<StoredSession>) -> Result<(), String> {
        let mut current = self
            .session
            .lock()
            .map_err(|e| format!("Session Data Error: {e:?}"))?;
        match session {
            Some(ref session) => write(&self.directory, SESSION_PATH, session)?,
            None => {
                let path = self.directory.join(SESSION_PATH);
                if path.exists() {
                    std::fs::remove_file(&path)
                        .map_err(|e| format!("Could not remove {}: {e:?}", path.display()))?;
                }
            }
        }
        *current = session;
        Ok(())
    }
}

fn read<T: DeserializeOwned>(directory: &Path, name: &str) -> Result<Option<T>, String> {
    let data_path = directory.join(name);
    if !data_path.exists() {
        return Ok(None);
    };
    let data = std::fs::read(&data_path)
        .map_err(|e| format!("Could not read {}: {e:?}", data_path.display()))?;
    let obj: T =
        from_slice(&data).map_err(|e| format!("Could not parse {}: {e:?}", data_path.display()))?;
    Ok(Some(obj))
}

fn write<T: Serialize>(directory: &Path, name: &str, value: &T) -> Result<(), String> {
    let data_path = directory.join(name);
    let data = to_string_pretty(&value).map_err(|e| format!("Could not parse value:{e:?}"))?;
    std::fs::write(&data_path, data)
        .map_err(|e| format!("Could not write to {}: {e:?}", data_path.display()))?;
    Ok(())
}

fn data_directory() -> Result<PathBuf, String> {
    use directories_next::ProjectDirs;
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "talkboard", "talkboard")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| "Couldn't find a folder to save data".to_string())
}
