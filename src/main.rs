//! oceanfft - headless FFT ocean simulation
//!
//! Advances one simulation (or a set of cascades) for a number of ticks and
//! writes the resulting height and foam maps as grayscale PNGs.

mod cli;

use std::path::Path;
use std::time::Instant;

use clap::Parser;
use image::{GrayImage, Luma};

use cli::{Args, BackendChoice};
use oceanfft::{
    ComputeBackend, CpuBackend, DerivedField, GpuBackend, GpuContext, OceanCascades, OceanParams,
    OceanResult, OceanSimulation, SimulationConfig, Texel,
};

/// Grayscale image of one channel, stretched over its min..max range
fn channel_image(texels: &[Texel], size: u32, channel: usize) -> GrayImage {
    let (min, max) = texels
        .iter()
        .map(|t| t[channel])
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = (max - min).max(1e-6);

    let mut img = GrayImage::new(size, size);
    for z in 0..size {
        for x in 0..size {
            let v = texels[(z * size + x) as usize][channel];
            let gray = ((v - min) / range * 255.0).clamp(0.0, 255.0) as u8;
            img.put_pixel(x, z, Luma([gray]));
        }
    }
    img
}

/// Grayscale image of foam intensity (already 0..1)
fn foam_image(texels: &[Texel], size: u32) -> GrayImage {
    let mut img = GrayImage::new(size, size);
    for z in 0..size {
        for x in 0..size {
            let v = texels[(z * size + x) as usize][0];
            img.put_pixel(x, z, Luma([(v * 255.0).clamp(0.0, 255.0) as u8]));
        }
    }
    img
}

fn save_maps<B: ComputeBackend>(
    sim: &mut OceanSimulation<B>,
    dir: &Path,
    prefix: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = sim.size();
    let height = sim.read_field(DerivedField::Height)?;
    let foam = sim.read_field(DerivedField::Foam)?;

    let height_path = dir.join(format!("{}height.png", prefix));
    let foam_path = dir.join(format!("{}foam.png", prefix));
    channel_image(&height, size, 0).save(&height_path)?;
    foam_image(&foam, size).save(&foam_path)?;

    let peak = height.iter().map(|t| t[0].abs()).fold(0.0f32, f32::max);
    let foam_cover = foam.iter().filter(|t| t[0] > 0.01).count() as f32 / foam.len() as f32;
    println!(
        "  {} peak |h| = {:.3} m, foam cover = {:.1}%",
        prefix.trim_end_matches('_'),
        peak,
        foam_cover * 100.0
    );
    println!("  Output: {}, {}", height_path.display(), foam_path.display());
    Ok(())
}

fn run<B: ComputeBackend>(
    args: &Args,
    params: OceanParams,
    config: SimulationConfig,
    mut make_backend: impl FnMut() -> OceanResult<B>,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&args.output_dir)?;

    match args.cascade_patch_sizes() {
        Some(patches) => {
            let backends = patches
                .iter()
                .map(|_| make_backend())
                .collect::<OceanResult<Vec<B>>>()?;
            let mut cascades = OceanCascades::new(backends, params, config, patches)?;
            for _ in 0..args.ticks {
                cascades.advance(args.dt)?;
            }
            for (i, cascade) in cascades.cascades_mut().iter_mut().enumerate() {
                save_maps(cascade, &args.output_dir, &format!("cascade{}_", i))?;
            }
            cascades.destroy();
        }
        None => {
            let mut sim = OceanSimulation::new(make_backend()?, params, config)?;
            for _ in 0..args.ticks {
                sim.advance(args.dt)?;
            }
            save_maps(&mut sim, &args.output_dir, "")?;
            sim.destroy();
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let params = args.ocean_params()?;
    let config = args.simulation_config();
    if let Some(path) = &args.save_params {
        params.to_file(path)?;
        println!("  Saved parameters: {}", path.display());
    }

    println!("FFT Ocean");
    println!("  Backend: {:?}", args.backend);
    println!("  Size: {}x{}", config.texture_size, config.texture_size);
    println!("  Ticks: {} x {:.4}s", args.ticks, args.dt);
    println!("  Wind: {} m/s", params.wind_speed_m_per_s);

    let start = Instant::now();
    match args.backend {
        BackendChoice::Cpu => run(&args, params, config, || Ok(CpuBackend::new()))?,
        BackendChoice::Gpu => {
            let context = GpuContext::new_blocking()?;
            run(&args, params, config, || GpuBackend::new(context.clone()))?
        }
    }

    println!("  Time: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
