use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use farm_weather_core::{
    Config, FarmLocation, LocationChain, WeatherData, WeatherResolution, WeatherService, advise,
    location::device_from_position,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "farm-weather", version, about = "Farm weather and field advice")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a WeatherAPI.com key in the config file.
    Configure,

    /// Resolve the current location and show weather with farm advice.
    Show {
        /// Device latitude; skips straight to reverse geocoding when set with --lon.
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Device longitude.
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Print the full resolution as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check that the configured API key is accepted.
    Validate,

    /// Search for farm locations by name.
    Search {
        query: String,
    },

    /// Fetch weather for the first match of every query concurrently.
    Batch {
        #[arg(required = true)]
        queries: Vec<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure => configure(&mut config),
            Command::Show { lat, lon, json } => {
                let position = lat.zip(lon).or(config.device.position());
                let chain = LocationChain::from_config(&config, device_from_position(position))
                    .context("Failed to build location resolvers")?;
                let service = WeatherService::new(&config, chain);

                let resolution = service.resolve().await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&resolution)?);
                } else {
                    print_resolution(&resolution);
                }
                Ok(())
            }
            Command::Validate => {
                let service = WeatherService::from_config(&config)?;
                let status = service.validate_api_key().await;
                println!("{}: {}", if status.valid { "OK" } else { "FAILED" }, status.message);
                if !status.valid {
                    bail!("API key validation failed");
                }
                Ok(())
            }
            Command::Search { query } => {
                let service = WeatherService::from_config(&config)?;
                let results = service.search_locations(&query).await;
                if results.is_empty() {
                    println!("No locations found for '{query}'.");
                }
                for farm in &results {
                    println!(
                        "{:>10}  {}  ({:.4}, {:.4})",
                        farm.id,
                        farm.display_name(),
                        farm.latitude,
                        farm.longitude
                    );
                }
                Ok(())
            }
            Command::Batch { queries } => {
                let service = WeatherService::from_config(&config)?;

                let mut farms: Vec<FarmLocation> = Vec::new();
                for query in &queries {
                    match service.search_locations(query).await.into_iter().next() {
                        Some(farm) => farms.push(farm),
                        None => eprintln!("No location found for '{query}', skipping."),
                    }
                }

                let results = service.fetch_many(&farms).await;
                for farm in &farms {
                    if let Some(data) = results.get(&farm.id) {
                        print_summary(&farm.display_name(), data);
                    }
                }
                Ok(())
            }
        }
    }
}

fn configure(config: &mut Config) -> Result<()> {
    let key = inquire::Password::new("WeatherAPI.com API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(key);
    config.save()?;

    println!("Saved API key to {}", Config::config_file_path()?.display());
    Ok(())
}

fn print_resolution(resolution: &WeatherResolution) {
    let weather = &resolution.weather;

    if !resolution.api_key_status.valid {
        println!("Note: {}", resolution.api_key_status.message);
    }
    if !resolution.source.is_live() {
        println!("Using simulated weather data.");
    }
    println!();

    print_summary(&resolution.location.name, weather);

    println!();
    println!("7-day outlook:");
    for day in &weather.daily {
        println!(
            "  {}  {:>5.1}°C / {:>5.1}°C  {:>3.0}% rain  {}",
            day.date.format("%a %d %b"),
            day.temperature.max,
            day.temperature.min,
            day.precipitation_probability * 100.0,
            day.condition.description,
        );
    }

    let advice = advise(weather);
    if !advice.is_empty() {
        println!();
        println!("Advice:");
        for item in advice {
            println!("  - {item}");
        }
    }
}

fn print_summary(name: &str, weather: &WeatherData) {
    let c = &weather.current;
    let source = if weather.source.is_live() { "live" } else { "simulated" };

    println!("{name} ({source})");
    println!(
        "  {}  {:.1}°C (feels {:.1}°C), humidity {}%, wind {:.1} m/s @ {}°, UV {:.0}",
        c.condition.description,
        c.temperature_c,
        c.feels_like_c,
        c.humidity_pct,
        c.wind_speed_ms,
        c.wind_direction_deg,
        c.uv_index,
    );
}
