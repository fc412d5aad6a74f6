use matchviz_cli::{FeatureAlgorithm, MatchHandler, MatcherAlgorithm};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use std::time::Instant;

/// Deterministic textured image; `seed` varies the pattern so the two sides are
/// related but not identical.
fn textured_image(width: i32, height: i32, seed: u32) -> Mat {
    let mut state = seed;
    let mut rows: Vec<Vec<u8>> = Vec::with_capacity(height as usize);
    for y in 0..height {
        let mut row = Vec::with_capacity(width as usize);
        for x in 0..width {
            let block = ((y / 8) * (width / 8) + (x / 8)) as u32;
            state = state
                .wrapping_mul(1664525)
                .wrapping_add(1013904223)
                .wrapping_add(block);
            row.push((state >> 24) as u8);
        }
        rows.push(row);
    }
    Mat::from_slice_2d(&rows).unwrap()
}

fn main() {
    println!("🔍 matchviz Synthetic Matching Demo");
    println!("====================================\n");

    let mut handler = MatchHandler::new(
        &[FeatureAlgorithm::Orb, FeatureAlgorithm::Brisk],
        &[MatcherAlgorithm::Bf, MatcherAlgorithm::Bf],
    )
    .expect("Failed to build pipelines");

    let reference = textured_image(320, 240, 7);
    let input = textured_image(320, 240, 7); // same pattern = strong matches

    let t0 = Instant::now();
    handler.set_reference_image(&reference).expect("Reference detection failed");
    handler.match_image(&input).expect("Matching failed");
    println!("Detect + match across {} pipelines: {:.2?}", handler.pipeline_count(), t0.elapsed());

    for (feature, matcher, count) in handler.match_counts() {
        println!("  {:>6}/{:<6} {} matches at ratio {}", feature, matcher, count, handler.accept_ratio());
    }

    // Tighten the filter and rematch: fewer, better matches.
    handler.change_accept_ratio(-0.3);
    handler.match_image(&input).expect("Matching failed");
    println!("\nAfter lowering the acceptance ratio to {}:", handler.accept_ratio());
    for (feature, matcher, count) in handler.match_counts() {
        println!("  {:>6}/{:<6} {} matches", feature, matcher, count);
    }

    let composite = handler.draw_match_result(800).expect("Rendering failed");
    imgcodecs::imwrite("synthetic_matches.png", &composite, &Vector::new())
        .expect("Failed to save composite");
    println!("\n✅ Saved composite visualization as synthetic_matches.png");
}
