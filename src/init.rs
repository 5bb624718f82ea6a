use crate::model::camera::CameraSettings;
use crate::model::light::LightSettings;
use crate::model::mesh::MeshSource;
use crate::model::particle::ParticleLayout;
use crate::model::simulation::{SimulationPolicy, SimulationSettings};
use crate::error::{SketchError, SketchResult};
use crate::util::Persistence;
use serde::{Deserialize, Serialize};

pub enum JsonImportMode {
    /// (Default) Will replace the code config with the json file
    Replace,
    /// Will ignore json file and use code only
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 2048,
            bias: 0.005,
        }
    }
}

/// Everything a sketch is built from. Missing json fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub particle_count: u32,
    pub policy: SimulationPolicy,
    pub layout: ParticleLayout,
    /// Scatter mesh of `mesh_surface_sample`.
    pub mesh: MeshSource,
    /// Ball radius of `volume_scatter`.
    pub volume_radius: f32,
    pub simulation: SimulationSettings,
    pub particle_size: f32,
    pub particle_color: [f32; 3],
    pub floor_color: [f32; 3],
    pub sphere_color: [f32; 3],
    pub clear_color: [f32; 3],
    pub shadow: ShadowSettings,
    pub light: LightSettings,
    pub camera: CameraSettings,
    /// Clip started on the skinned rig.
    pub animation: Option<String>,
    pub show_shadow_map: bool,
    /// Read particles back every n frames and log their lives.
    pub readback_interval: Option<u32>,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            particle_count: 200_000,
            policy: SimulationPolicy::SkinnedMeshSample,
            layout: ParticleLayout::WithVelocity,
            mesh: MeshSource::Torus,
            volume_radius: 1.5,
            simulation: SimulationSettings::default(),
            particle_size: 0.013,
            particle_color: [0.9, 0.85, 0.8],
            floor_color: [0.82, 0.82, 0.85],
            sphere_color: [0.55, 0.6, 0.7],
            clear_color: [0.82, 0.82, 0.85],
            shadow: ShadowSettings::default(),
            light: LightSettings::default(),
            camera: CameraSettings::default(),
            animation: Some(crate::model::rig::SWAY_CLIP.to_string()),
            show_shadow_map: false,
            readback_interval: None,
            seed: None,
        }
    }
}

impl SketchConfig {
    /// Rejects values the device can't create resources for.
    pub fn validate(&self, max_texture_dimension: u32) -> SketchResult<()> {
        let map_size = self.shadow.map_size;

        if map_size == 0 || map_size > max_texture_dimension {
            return Err(SketchError::Config(format!(
                "shadow map size {} outside 1..={}",
                map_size, max_texture_dimension
            )));
        }

        Ok(())
    }
}

pub trait AppSettings {
    fn config(&self) -> SketchConfig {
        SketchConfig::default()
    }

    fn import_mode(&self) -> JsonImportMode {
        JsonImportMode::Replace
    }
}

pub struct InitSettings;

impl InitSettings {
    pub fn create_config(app_settings: &impl AppSettings) -> SketchConfig {
        match app_settings.import_mode() {
            JsonImportMode::Ignore => app_settings.config(),
            JsonImportMode::Replace => match Persistence::import_config() {
                Ok(Some(config)) => config,
                Ok(None) => app_settings.config(),
                Err(err) => {
                    log::warn!("{}, using code config", err);
                    app_settings.config()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SketchConfig = serde_json::from_str(
            r#"{ "particle_count": 10, "policy": "volume_scatter", "shadow": { "bias": 0.01 } }"#,
        )
        .unwrap();

        assert_eq!(config.particle_count, 10);
        assert_eq!(config.policy, SimulationPolicy::VolumeScatter);
        assert_eq!(config.shadow.bias, 0.01);
        assert_eq!(config.shadow.map_size, 2048);
        assert_eq!(config.layout, ParticleLayout::WithVelocity);
    }

    #[test]
    fn config_survives_json() {
        let config = SketchConfig {
            mesh: MeshSource::Cube,
            readback_interval: Some(60),
            seed: Some(7),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: SketchConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.mesh, MeshSource::Cube);
        assert_eq!(back.readback_interval, Some(60));
        assert_eq!(back.seed, Some(7));
        assert_eq!(back.animation.as_deref(), Some("sway"));
    }

    #[test]
    fn shadow_map_size_must_fit_the_device() {
        let sized = |map_size| SketchConfig {
            shadow: ShadowSettings {
                map_size,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(sized(2048).validate(8192).is_ok());
        assert!(sized(8192).validate(8192).is_ok());
        assert!(matches!(sized(0).validate(8192), Err(SketchError::Config(_))));
        assert!(matches!(sized(16384).validate(8192), Err(SketchError::Config(_))));
    }

    #[test]
    fn zero_map_size_from_json_is_rejected() {
        let config = Persistence::parse_config(r#"{ "shadow": { "map_size": 0 } }"#).unwrap();

        assert!(config.validate(8192).is_err());
    }

    #[test]
    fn ignore_mode_uses_code() {
        struct Code;

        impl AppSettings for Code {
            fn config(&self) -> SketchConfig {
                SketchConfig {
                    particle_count: 3,
                    ..Default::default()
                }
            }

            fn import_mode(&self) -> JsonImportMode {
                JsonImportMode::Ignore
            }
        }

        assert_eq!(InitSettings::create_config(&Code).particle_count, 3);
    }
}
