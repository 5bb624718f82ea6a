use crate::error::{SketchError, SketchResult};
use crate::init::SketchConfig;
use std::{fs, io::ErrorKind, path::PathBuf};

pub const CONFIG_ENV: &str = "PARTICLE_SKETCH_CONFIG";
pub const CONFIG_FILE: &str = "sketch.json";

pub struct Persistence;

impl Persistence {
    /// `$PARTICLE_SKETCH_CONFIG` when set, `sketch.json` in the crate root otherwise.
    pub fn config_path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => {
                let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
                dir.push(CONFIG_FILE);
                dir
            }
        }
    }

    /// `Ok(None)` when there is no config file.
    pub fn import_config() -> SketchResult<Option<SketchConfig>> {
        let path = Self::config_path();

        match fs::read_to_string(&path) {
            Ok(val) => {
                log::info!("importing config from {}", path.display());
                Self::parse_config(&val).map(Some)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SketchError::Config(format!(
                "can't read {}: {}",
                path.display(),
                err
            ))),
        }
    }

    pub fn parse_config(json: &str) -> SketchResult<SketchConfig> {
        serde_json::from_str::<SketchConfig>(json)
            .map_err(|err| SketchError::Config(format!("Wrong syntaxed JSON: {}", err)))
    }
}
