use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use rusty_kitti::config::{DatasetConfig, SplitConfig};

const ROAD: u32 = 40;
const SIDEWALK: u32 = 48;
const CAR: u32 = 10;
const VEGETATION: u32 = 70;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One synthetic scan: a road strip, a sidewalk with almost the same
/// remission and height right next to it, a few cars and vegetation.
fn generate_frame(frame: usize, rng: &mut SimpleRng) -> (Vec<[f32; 4]>, Vec<u32>) {
    let mut points = Vec::new();
    let mut labels = Vec::new();
    let mut push = |p: [f64; 4], label: u32| {
        points.push([p[0] as f32, p[1] as f32, p[2] as f32, p[3].clamp(0.0, 1.0) as f32]);
        labels.push(label);
    };

    for _ in 0..3000 {
        let x = rng.uniform(-45.0, 45.0);
        let y = rng.uniform(-4.0, 4.0);
        push([x, y, rng.gauss(-1.73, 0.03), rng.gauss(0.30, 0.05)], ROAD);
    }
    for _ in 0..1200 {
        let x = rng.uniform(-45.0, 45.0);
        let y = rng.uniform(4.0, 7.0) * if rng.next_f64() < 0.5 { -1.0 } else { 1.0 };
        push([x, y, rng.gauss(-1.62, 0.04), rng.gauss(0.32, 0.06)], SIDEWALK);
    }

    // cars drift along the road from frame to frame
    for car in 0..3 {
        let cx = -30.0 + car as f64 * 25.0 + frame as f64 * 0.8;
        for _ in 0..400 {
            let p = [
                rng.gauss(cx, 1.2),
                rng.gauss(-1.5 + car as f64, 0.5),
                rng.uniform(-1.7, -0.2),
                rng.gauss(0.75, 0.1),
            ];
            push(p, CAR);
        }
    }

    // vegetation only in every other frame
    if frame % 2 == 0 {
        for _ in 0..800 {
            let x = rng.uniform(-40.0, 40.0);
            let y = rng.uniform(9.0, 14.0);
            push([x, y, rng.uniform(-1.0, 3.0), rng.gauss(0.55, 0.12)], VEGETATION);
        }
    }

    (points, labels)
}

fn write_points(path: &Path, points: &[[f32; 4]]) -> Result<()> {
    let bytes: Vec<u8> = points
        .iter()
        .flat_map(|p| p.iter().flat_map(|v| v.to_le_bytes()))
        .collect();
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn write_labels(path: &Path, labels: &[u32]) -> Result<()> {
    let bytes: Vec<u8> = labels.iter().flat_map(|l| l.to_le_bytes()).collect();
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn dataset_config() -> DatasetConfig {
    let labels: BTreeMap<u32, String> = [
        (0, "unlabeled"),
        (1, "outlier"),
        (CAR, "car"),
        (ROAD, "road"),
        (SIDEWALK, "sidewalk"),
        (VEGETATION, "vegetation"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect();
    let color_map: BTreeMap<u32, [u8; 3]> = [
        (0, [0, 0, 0]),
        (1, [255, 0, 0]),
        (CAR, [100, 150, 245]),
        (ROAD, [255, 0, 255]),
        (SIDEWALK, [75, 0, 75]),
        (VEGETATION, [0, 175, 0]),
    ]
    .into_iter()
    .collect();
    DatasetConfig {
        labels,
        color_map,
        split: SplitConfig {
            train: vec![0],
            valid: vec![],
            test: vec![],
        },
    }
}

fn main() -> Result<()> {
    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_dataset"));
    let frames = 20;
    let mut rng = SimpleRng::new(42);

    let seq_dir = root.join("sequences").join("00");
    let scan_dir = seq_dir.join("velodyne");
    let label_dir = seq_dir.join("labels");
    std::fs::create_dir_all(&scan_dir).context("creating velodyne directory")?;
    std::fs::create_dir_all(&label_dir).context("creating labels directory")?;

    for frame in 0..frames {
        let (points, mut labels) = generate_frame(frame, &mut rng);
        // one frame with a truncated label file, as left behind by an unfinished labelling run
        if frame == 13 {
            labels.truncate(labels.len() - 100);
        }
        write_points(&scan_dir.join(format!("{frame:06}.bin")), &points)?;
        write_labels(&label_dir.join(format!("{frame:06}.label")), &labels)?;
    }

    let config_path = root.join("semantic-kitti.yaml");
    let yaml = serde_yaml::to_string(&dataset_config()).context("serializing config")?;
    std::fs::write(&config_path, yaml)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote {frames} frames to {} and config to {}",
        seq_dir.display(),
        config_path.display()
    );
    Ok(())
}
