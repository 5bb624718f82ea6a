use particle_sketch::init::AppSettings;

struct Sketchbook;

impl AppSettings for Sketchbook {}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    particle_sketch::start(Sketchbook)
}
