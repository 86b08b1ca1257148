use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dotlife::config::Params;
use dotlife::render;
use dotlife::rules::RuleKind;
use dotlife::Sim;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    // A first argument ending in .json is a config file; otherwise positional overrides.
    let (mut params, rest) = match args.get(1) {
        Some(path) if path.ends_with(".json") => match Params::from_json_file(path) {
            Ok(p) => (p, &args[2..]),
            Err(err) => {
                error!(%err, "bad config");
                std::process::exit(2);
            }
        },
        _ => (Params::default(), args.get(1..).unwrap_or(&[])),
    };

    if let Some(seed) = rest.first().and_then(|s| s.parse().ok()) {
        params.seed = seed;
    }
    if let Some(w) = rest.get(1).and_then(|s| s.parse().ok()) {
        params.width = w;
    }
    if let Some(h) = rest.get(2).and_then(|s| s.parse().ok()) {
        params.height = h;
    }
    let generations: u64 = rest.get(3).and_then(|s| s.parse().ok()).unwrap_or(50);
    if let Some(rule) = rest.get(4) {
        match rule.parse::<RuleKind>() {
            Ok(kind) => params.rule = kind,
            Err(err) => {
                error!(%err, "bad rule");
                std::process::exit(2);
            }
        }
    }
    let out_dir: PathBuf = rest
        .get(5)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));
    if params.initial_dots == 0 {
        params.initial_dots = params.width * params.height * 35 / 100;
    }

    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");

    let mut sim = match Sim::new(params) {
        Ok(sim) => sim,
        Err(err) => {
            error!(%err, "cannot start");
            std::process::exit(2);
        }
    };
    let cell_size = sim.params().cell_size;
    let (gw, gh) = sim.grid().bounds();
    let (pw, ph) = (gw as u32 * cell_size, gh as u32 * cell_size);

    info!(
        width = gw,
        height = gh,
        seed = sim.params().seed,
        rule = %sim.rule_name(),
        generations,
        "running"
    );

    let save = |name: String, rgba: &[u8]| {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, pw, ph, image::ColorType::Rgba8)
            .expect("failed to save image");
        info!("saved {}", path.display());
    };

    save("frame_0000.png".into(), &render::render_frame(&sim, cell_size));

    let mut step_ms = 0.0;
    for _ in 0..generations {
        let report = match sim.tick() {
            Ok(r) => r,
            Err(err) => {
                error!(%err, "step failed");
                std::process::exit(1);
            }
        };
        step_ms += report
            .timings
            .iter()
            .find(|t| t.name == "TOTAL")
            .map_or(0.0, |t| t.ms);
        save(
            format!("frame_{:04}.png", report.generation),
            &render::render_frame(&sim, cell_size),
        );
        if report.live == 0 {
            info!(generation = report.generation, "everything died");
            break;
        }
    }

    eprintln!("\nTimings:");
    eprintln!("  {:20} {:8.1} ms", "steps", step_ms);
    eprintln!("  {:20} {:8}", "generations", sim.generation());
    eprintln!("  {:20} {:8}", "live", sim.grid().live_count());
    eprintln!("\nDone.");
}
