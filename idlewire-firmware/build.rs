//! Build script for idlewire-firmware
//!
//! - Passes the cortex-m-rt and defmt linker scripts
//! - Validates idlewire.toml and compiles it to a postcard blob

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use idlewire_core::PipelineConfig;

const CONFIG_FILE: &str = "idlewire.toml";
const CONFIG_BLOB: &str = "idlewire.bin";

fn main() {
    setup_linker();
    compile_config();
}

/// Linker arguments for the firmware binary
fn setup_linker() {
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate idlewire.toml and write the binary form to OUT_DIR
fn compile_config() {
    println!("cargo:rerun-if-changed={}", CONFIG_FILE);

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let config_path = Path::new(CONFIG_FILE);

    let config = if config_path.exists() {
        let content = match fs::read_to_string(config_path) {
            Ok(content) => content,
            Err(e) => fail("Failed to read idlewire.toml", &[e.to_string()]),
        };
        parse_config(&content)
    } else {
        println!("cargo:warning=idlewire.toml not found, using built-in defaults");
        PipelineConfig::default()
    };

    if let Err(e) = config.validate() {
        fail("Invalid configuration in idlewire.toml", &[format!("{:?}", e)]);
    }

    let blob = match postcard::to_stdvec(&config) {
        Ok(blob) => blob,
        Err(e) => fail("Failed to encode configuration", &[e.to_string()]),
    };

    if let Err(e) = fs::write(out_dir.join(CONFIG_BLOB), blob) {
        fail("Failed to write configuration blob", &[e.to_string()]);
    }
}

/// Parse the TOML text into a pipeline configuration
///
/// `keepalive = false` disables the keep-alive command. Missing keys take
/// their default values.
fn parse_config(content: &str) -> PipelineConfig {
    let mut value: toml::Value = match toml::from_str(content) {
        Ok(value) => value,
        Err(e) => fail("Invalid TOML syntax in idlewire.toml", &[e.to_string()]),
    };

    let Some(table) = value.as_table_mut() else {
        fail("idlewire.toml must be a table", &[]);
    };

    let mut errors = Vec::new();
    for key in table.keys() {
        if !["baudrate", "framing", "scan", "echo", "keepalive"].contains(&key.as_str()) {
            errors.push(format!("unknown key '{}'", key));
        }
    }
    if !errors.is_empty() {
        fail("Invalid configuration in idlewire.toml", &errors);
    }

    let keepalive_disabled = matches!(table.get("keepalive"), Some(toml::Value::Boolean(false)));
    if keepalive_disabled {
        table.remove("keepalive");
    }

    let mut config = PipelineConfig::default();
    if let Some(v) = table.get("baudrate") {
        config.baudrate = field(v, "baudrate");
    }
    if let Some(v) = table.get("framing") {
        config.framing = field(v, "framing");
    }
    if let Some(v) = table.get("scan") {
        config.scan = field(v, "scan");
    }
    if let Some(v) = table.get("echo") {
        config.echo = field(v, "echo");
    }
    if let Some(v) = table.get("keepalive") {
        config.keepalive = Some(field(v, "keepalive"));
    }
    if keepalive_disabled {
        config.keepalive = None;
    }

    config
}

fn field<T: serde::de::DeserializeOwned>(value: &toml::Value, name: &str) -> T {
    match value.clone().try_into() {
        Ok(v) => v,
        Err(e) => fail(
            "Invalid configuration in idlewire.toml",
            &[format!("'{}': {}", name, e)],
        ),
    }
}

fn fail(title: &str, details: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        details
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
