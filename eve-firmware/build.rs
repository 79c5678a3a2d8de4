//! Build script for eve-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates panel.toml at compile time and turns it into constants

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use eve_core::config::{BacklightConfig, PanelConfig};
use serde::Deserialize;

fn main() {
    setup_linker();
    let settings = load_panel_config();
    generate_panel_module(&settings);
}

/// Layout of panel.toml
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PanelFile {
    #[serde(default)]
    panel: PanelConfig,
    #[serde(default)]
    backlight: BacklightConfig,
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and validate panel.toml
fn load_panel_config() -> PanelFile {
    println!("cargo:rerun-if-changed=panel.toml");

    let config_path = Path::new("panel.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: panel.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a panel.toml with the display timings.    ║\n\
            ║  Please create one in the eve-firmware directory.                ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read panel.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let settings: PanelFile = match toml::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid panel.toml                                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    if let Err(e) = settings.panel.validate() {
        errors.push(format!("[panel] {}", e));
    }
    if settings.backlight.duty > BacklightConfig::MAX_DUTY {
        errors.push(format!(
            "[backlight] duty must be 0-{}",
            BacklightConfig::MAX_DUTY
        ));
    }
    if !(250..=10_000).contains(&settings.backlight.frequency_hz) {
        errors.push("[backlight] frequency_hz must be 250-10000".to_string());
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid panel configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!(
        "cargo:warning=panel.toml validated: {}x{}",
        settings.panel.hsize, settings.panel.vsize
    );
    settings
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.chars().count() > 64 {
                format!("{}...", line.chars().take(61).collect::<String>())
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write `panel.rs` into OUT_DIR
fn generate_panel_module(settings: &PanelFile) {
    let p = &settings.panel;
    let b = &settings.backlight;
    let source = format!(
        "// Generated from panel.toml\n\
         pub const PANEL: PanelConfig = PanelConfig {{\n    \
             hsize: {},\n    hcycle: {},\n    hoffset: {},\n    hsync0: {},\n    hsync1: {},\n    \
             vsize: {},\n    vcycle: {},\n    voffset: {},\n    vsync0: {},\n    vsync1: {},\n    \
             pclk: {},\n    pclk_pol: {},\n    swizzle: {},\n    dither: {},\n    cspread: {},\n\
         }};\n\
         pub const BACKLIGHT: BacklightConfig = BacklightConfig {{\n    \
             duty: {},\n    frequency_hz: {},\n\
         }};\n",
        p.hsize,
        p.hcycle,
        p.hoffset,
        p.hsync0,
        p.hsync1,
        p.vsize,
        p.vcycle,
        p.voffset,
        p.vsync0,
        p.vsync1,
        p.pclk,
        p.pclk_pol,
        p.swizzle,
        p.dither,
        p.cspread,
        b.duty,
        b.frequency_hz,
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("panel.rs"), source).unwrap();
}
