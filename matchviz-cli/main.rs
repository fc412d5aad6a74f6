use matchviz_cli::{AcceptRatio, MatchHandler};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

struct Args {
    reference: String,
    inputs: Vec<String>,
    features: Vec<String>,
    matchers: Vec<String>,
    ratio: Option<f32>,
    max_height: i32,
    out_dir: PathBuf,
    #[cfg(feature = "serde")]
    config: Option<String>,
}

fn usage() -> ! {
    eprintln!(
        "Usage: matchviz [OPTIONS] <reference-image> <input-image>...\n\
         \n\
         Options:\n\
         \x20 --features <list>    Comma-separated feature algorithms (sift, surf, orb, kaze, brisk) [default: orb]\n\
         \x20 --matchers <list>    Comma-separated matcher algorithms (flann, bf), paired positionally [default: bf]\n\
         \x20 --ratio <r>          Initial acceptance ratio in [0, 1] [default: 0.5]\n\
         \x20 --max-height <px>    Downscale composites taller than this (0 = never) [default: 0]\n\
         \x20 --out-dir <dir>      Directory for composite images [default: .]\n\
         {}",
        if cfg!(feature = "serde") {
            "\x20 --config <toml>      Load features/matchers/ratio from a TOML file\n"
        } else {
            ""
        }
    );
    std::process::exit(2);
}

fn parse_args() -> Args {
    let mut args = Args {
        reference: String::new(),
        inputs: Vec::new(),
        features: vec!["orb".to_string()],
        matchers: vec!["bf".to_string()],
        ratio: None,
        max_height: 0,
        out_dir: PathBuf::from("."),
        #[cfg(feature = "serde")]
        config: None,
    };

    let mut positional = Vec::new();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => usage(),
            "--features" => {
                let list = iter.next().unwrap_or_else(|| usage());
                args.features = list.split(',').map(str::to_string).collect();
            }
            "--matchers" => {
                let list = iter.next().unwrap_or_else(|| usage());
                args.matchers = list.split(',').map(str::to_string).collect();
            }
            "--ratio" => {
                let value = iter.next().unwrap_or_else(|| usage());
                args.ratio = Some(value.parse().unwrap_or_else(|_| usage()));
            }
            "--max-height" => {
                let value = iter.next().unwrap_or_else(|| usage());
                args.max_height = value.parse().unwrap_or_else(|_| usage());
            }
            "--out-dir" => {
                args.out_dir = PathBuf::from(iter.next().unwrap_or_else(|| usage()));
            }
            #[cfg(feature = "serde")]
            "--config" => {
                args.config = Some(iter.next().unwrap_or_else(|| usage()));
            }
            _ if arg.starts_with("--") => usage(),
            _ => positional.push(arg),
        }
    }

    if positional.len() < 2 {
        usage();
    }
    args.reference = positional.remove(0);
    args.inputs = positional;
    args
}

fn load_image(path: &str) -> Mat {
    let img = imgcodecs::imread(path, imgcodecs::IMREAD_COLOR)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    if img.empty() {
        eprintln!("Could not decode image: {}", path);
        std::process::exit(1);
    }
    img
}

fn build_handler(args: &Args) -> MatchHandler {
    #[cfg(feature = "serde")]
    if let Some(path) = &args.config {
        let config = matchviz_cli::MatchConfig::load_toml(path)
            .unwrap_or_else(|e| panic!("Failed to load config {}: {}", path, e));
        return MatchHandler::from_config(&config).expect("Invalid pipeline configuration");
    }

    MatchHandler::from_names(&args.features, &args.matchers)
        .expect("Invalid pipeline configuration")
}

fn main() {
    env_logger::init();
    let args = parse_args();

    let mut handler = build_handler(&args);
    if let Some(ratio) = args.ratio {
        handler.set_accept_ratio(AcceptRatio::new(ratio));
    }

    let reference = load_image(&args.reference);
    let t0 = Instant::now();
    handler
        .set_reference_image(&reference)
        .expect("Reference detection failed");
    println!(
        "Reference {} processed across {} pipeline(s) in {:.2?}",
        args.reference,
        handler.pipeline_count(),
        t0.elapsed()
    );

    for (index, path) in args.inputs.iter().enumerate() {
        let input = load_image(path);

        let t0 = Instant::now();
        handler.match_image(&input).expect("Matching failed");
        let elapsed = t0.elapsed();

        println!("{} ({:.2?}):", path, elapsed);
        for (feature, matcher, count) in handler.match_counts() {
            println!("  {:>6}/{:<6} {} matches", feature.name(), matcher.name(), count);
        }

        let composite = handler
            .draw_match_result(args.max_height)
            .expect("Rendering failed");
        let out_path = args.out_dir.join(format!("match_{:03}.png", index));
        let out_str = out_path.to_string_lossy().into_owned();
        imgcodecs::imwrite(&out_str, &composite, &Vector::new())
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", out_str, e));
        println!("  saved {}", out_str);
    }
}
