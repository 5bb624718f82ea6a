use crate::error::{SketchError, SketchResult};
use crate::model::GfxState;
use std::borrow::Cow;

pub const DECLARATIONS: &str = "declarations";
pub const SDR_COMPUTE: &str = "compute";
pub const SDR_PARTICLE: &str = "particle";
pub const SDR_PARTICLE_DEPTH: &str = "particle_depth";
pub const SDR_GEOMETRY: &str = "geometry";
pub const SDR_GEOMETRY_DEPTH: &str = "geometry_depth";
pub const SDR_DEBUG_DEPTH: &str = "debug_depth";

pub const DIR_MESH_SAMPLE: &str = "MESH_SAMPLE";
pub const DIR_STATIC_MESH: &str = "STATIC_MESH";
pub const DIR_SKINNED: &str = "SKINNED";
pub const DIR_HAS_VELOCITY: &str = "HAS_VELOCITY";

pub const DEF_WORKGROUP_SIZE: &str = "WORKGROUP_SIZE";
pub const DEF_SHADOW_MAP_SIZE: &str = "SHADOW_MAP_SIZE";

/// Every WGSL file shipped with the crate, by include name.
fn builtin(name: &str) -> Option<&'static str> {
    let source = match name {
        "declarations" => include_str!("declarations.wgsl"),
        "noise" => include_str!("noise.wgsl"),
        "shadows" => include_str!("shadows.wgsl"),
        "quaternion" => include_str!("quaternion.wgsl"),
        "billboard" => include_str!("billboard.wgsl"),
        "compute" => include_str!("compute.wgsl"),
        "particle" => include_str!("particle.wgsl"),
        "particle_depth" => include_str!("particle_depth.wgsl"),
        "geometry" => include_str!("geometry.wgsl"),
        "geometry_depth" => include_str!("geometry_depth.wgsl"),
        "debug_depth" => include_str!("debug_depth.wgsl"),
        _ => return None,
    };

    Some(source)
}

fn finalize_shader(shader_str: &str, if_directives: &[&str]) -> String {
    let mut append_line = true;
    let mut result = String::new();

    for line_raw in shader_str.lines() {
        let line = line_raw.trim();

        if let Some(stripped) = line.strip_prefix("#if") {
            let key = stripped.trim();
            append_line = if_directives.contains(&key);
        } else if line.starts_with("#else") {
            append_line = !append_line;
        } else if line.starts_with("#endif") {
            append_line = true;
        } else if append_line {
            result.push_str(line);
            result.push('\n');
        }
    }

    result
}

/// Splices `#include <name>` lines, each snippet at most once.
fn resolve_includes(
    source: &str,
    if_directives: &[&str],
    included: &mut Vec<String>,
) -> SketchResult<String> {
    let mut result = String::new();

    for line in finalize_shader(source, if_directives).lines() {
        match line.strip_prefix("#include") {
            Some(name) => {
                let name = name.trim();

                if included.iter().any(|n| n == name) {
                    continue;
                }

                let snippet =
                    builtin(name).ok_or_else(|| SketchError::UnknownShader(name.to_string()))?;
                included.push(name.to_string());

                result += &resolve_includes(snippet, if_directives, included)?;
            }
            None => {
                result.push_str(line);
                result.push('\n');
            }
        }
    }

    Ok(result)
}

fn apply_defines(mut source: String, defines: &[(&str, String)]) -> SketchResult<String> {
    for (key, value) in defines {
        source = source.replace(&format!("{{{{{}}}}}", key), value);
    }

    if let Some(start) = source.find("{{") {
        let rest = &source[start + 2..];
        let key = rest.split("}}").next().unwrap_or(rest);

        return Err(SketchError::UnknownShader(format!("undefined {}", key)));
    }

    Ok(source)
}

pub struct ShaderOptions<'a> {
    pub files: &'a [&'a str],
    pub if_directives: &'a [&'a str],
    pub defines: &'a [(&'a str, String)],
    pub label: &'a str,
}

/// Builds the WGSL source for `options`, starting with `declarations.wgsl`.
pub fn assemble_shader(options: &ShaderOptions) -> SketchResult<String> {
    let mut included = Vec::new();
    let all_files = [&[DECLARATIONS], options.files].concat();
    let mut shader_str = String::new();

    for filename in all_files {
        let file =
            builtin(filename).ok_or_else(|| SketchError::UnknownShader(filename.to_string()))?;

        if included.iter().any(|n| n == filename) {
            continue;
        }

        included.push(filename.to_string());
        shader_str += &resolve_includes(file, options.if_directives, &mut included)?;
    }

    apply_defines(shader_str, options.defines)
}

impl GfxState {
    pub fn create_shader_builtin(&self, options: ShaderOptions) -> SketchResult<wgpu::ShaderModule> {
        let shader_str = assemble_shader(&options)?;
        log::debug!("assembled shader '{}' ({} bytes)", options.label, shader_str.len());

        Ok(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(options.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(shader_str)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(label: &str, source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("{} does not parse: {}\n{}", label, e, source));

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{} does not validate: {:?}", label, e));
    }

    fn defines() -> Vec<(&'static str, String)> {
        vec![
            (DEF_WORKGROUP_SIZE, "64".to_string()),
            (DEF_SHADOW_MAP_SIZE, "2048".to_string()),
        ]
    }

    fn assemble(files: &[&str], if_directives: &[&str]) -> String {
        let defines = defines();

        assemble_shader(&ShaderOptions {
            files,
            if_directives,
            defines: &defines,
            label: "test",
        })
        .expect("shader assembles")
    }

    #[test]
    fn if_directives_select_branches() {
        let src = "a\n#if KEY\nb\n#else\nc\n#endif\nd";

        assert_eq!(finalize_shader(src, &["KEY"]), "a\nb\nd\n");
        assert_eq!(finalize_shader(src, &[]), "a\nc\nd\n");
    }

    #[test]
    fn includes_are_spliced_once() {
        let src = assemble(&[SDR_PARTICLE], &[]);

        assert_eq!(src.matches("fn shadow_calculation").count(), 1);
        assert_eq!(src.matches("struct Scene").count(), 1);
        assert!(!src.contains("#include"));
    }

    #[test]
    fn unknown_include_is_an_error() {
        let mut included = Vec::new();
        let res = resolve_includes("#include nope\n", &[], &mut included);

        assert!(matches!(res, Err(SketchError::UnknownShader(name)) if name == "nope"));
    }

    #[test]
    fn unknown_file_is_an_error() {
        let res = assemble_shader(&ShaderOptions {
            files: &["missing"],
            if_directives: &[],
            defines: &[],
            label: "missing",
        });

        assert!(matches!(res, Err(SketchError::UnknownShader(_))));
    }

    #[test]
    fn missing_define_is_an_error() {
        let res = assemble_shader(&ShaderOptions {
            files: &[SDR_COMPUTE],
            if_directives: &[],
            defines: &[],
            label: "compute",
        });

        assert!(matches!(res, Err(SketchError::UnknownShader(key)) if key.contains(DEF_WORKGROUP_SIZE)));
    }

    #[test]
    fn defines_are_substituted() {
        let src = assemble(&[SDR_COMPUTE], &[]);

        assert!(src.contains("@workgroup_size(64)"));
        assert!(!src.contains("{{"));
    }

    #[test]
    fn compute_shader_validates_for_every_policy_and_layout() {
        let policies: [&[&str]; 3] = [
            &[],
            &[DIR_MESH_SAMPLE, DIR_STATIC_MESH],
            &[DIR_MESH_SAMPLE, DIR_SKINNED],
        ];

        for policy in policies {
            for velocity in [false, true] {
                let mut dirs = policy.to_vec();

                if velocity {
                    dirs.push(DIR_HAS_VELOCITY);
                }

                validate(&format!("compute {:?}", dirs), &assemble(&[SDR_COMPUTE], &dirs));
            }
        }
    }

    #[test]
    fn render_shaders_validate() {
        for file in [
            SDR_PARTICLE,
            SDR_PARTICLE_DEPTH,
            SDR_GEOMETRY,
            SDR_GEOMETRY_DEPTH,
            SDR_DEBUG_DEPTH,
        ] {
            validate(file, &assemble(&[file], &[]));
            validate(file, &assemble(&[file], &[DIR_HAS_VELOCITY]));
        }
    }
}
