//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use oceanfft::{OceanParams, OceanResult, SimulationConfig, SpectrumModel};

/// Compute backend selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// Reference kernels on the host
    Cpu,
    /// wgpu compute
    Gpu,
}

/// Spectrum model selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModelChoice {
    Jonswap,
    Phillips,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "oceanfft")]
#[command(about = "Headless FFT ocean simulation with PNG output", long_about = None)]
pub struct Args {
    /// Compute backend
    #[arg(long, value_enum, default_value = "cpu")]
    pub backend: BackendChoice,

    /// Texture side length (power of two, at least 4)
    #[arg(long, default_value_t = 256)]
    pub size: u32,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 60)]
    pub ticks: u32,

    /// Timestep per tick (seconds)
    #[arg(long, value_name = "SECONDS", default_value_t = 1.0 / 60.0)]
    pub dt: f32,

    /// Noise seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Load ocean parameters from a JSON file
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Write the effective ocean parameters to a JSON file
    #[arg(long, value_name = "FILE")]
    pub save_params: Option<PathBuf>,

    /// Override wind speed (m/s)
    #[arg(long, value_name = "M_PER_S")]
    pub wind_speed: Option<f32>,

    /// Override wind direction (degrees, 0 = +X)
    #[arg(long, value_name = "DEGREES")]
    pub wind_direction: Option<f32>,

    /// Override spectrum model
    #[arg(long, value_enum)]
    pub model: Option<ModelChoice>,

    /// Horizontal displacement multiplier
    #[arg(long, default_value_t = 1.0)]
    pub choppiness: f32,

    /// Patch sizes in meters; more than one runs wavelength-banded cascades
    #[arg(long, value_name = "METERS", value_delimiter = ',')]
    pub patch_sizes: Vec<f32>,

    /// Directory for PNG output
    #[arg(long, value_name = "DIR", default_value = "ocean_out")]
    pub output_dir: PathBuf,
}

impl Args {
    /// Ocean parameters from file (or defaults) with command-line overrides
    pub fn ocean_params(&self) -> OceanResult<OceanParams> {
        let mut params = match &self.params {
            Some(path) => {
                log::info!("Loading ocean parameters from {}", path.display());
                OceanParams::from_file(path)?
            }
            None => OceanParams::default(),
        };

        if let Some(speed) = self.wind_speed {
            params.wind_speed_m_per_s = speed;
        }
        if let Some(degrees) = self.wind_direction {
            params.wind_direction_rad = degrees.to_radians();
        }
        if let Some(model) = self.model {
            params.model = match model {
                ModelChoice::Jonswap => SpectrumModel::Jonswap,
                ModelChoice::Phillips => SpectrumModel::Phillips,
            };
        }
        if let [patch] = self.patch_sizes.as_slice() {
            params.patch_size_m = *patch;
        }
        Ok(params)
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            texture_size: self.size,
            noise_seed: self.seed,
            displacement_scale: self.choppiness,
            ..Default::default()
        }
    }

    /// Patch sizes to run as cascades, if more than one was given
    pub fn cascade_patch_sizes(&self) -> Option<&[f32]> {
        (self.patch_sizes.len() > 1).then_some(self.patch_sizes.as_slice())
    }
}
