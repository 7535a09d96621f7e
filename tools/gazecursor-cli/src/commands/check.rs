//! Check cursor backend availability.

use gazecursor_common::config::config_file_path;
use gazecursor_cursor_driver::{detect_best_driver, ScreenSize, XdotoolCursor};

pub fn run() -> anyhow::Result<()> {
    println!("GazeCursor System Check");
    println!("{}", "=".repeat(50));

    if XdotoolCursor::is_supported() {
        println!("[OK] xdotool cursor backend available");
    } else {
        println!("[WARN] xdotool cursor backend unavailable (needs X11 and xdotool)");
    }

    let mut driver = detect_best_driver(ScreenSize::default());
    let screen = driver.screen_size();
    println!("[OK] Using cursor backend: {}", driver.name());
    println!("     Screen: {}x{}", screen.width, screen.height);
    match driver.position() {
        Ok(p) => println!("     Cursor at: ({}, {})", p.x, p.y),
        Err(e) => println!("[WARN] Cannot read cursor position: {e}"),
    }

    let path = config_file_path();
    println!();
    if path.exists() {
        println!("[OK] Config file: {}", path.display());
    } else {
        println!("[INFO] No config file at {} (defaults in use)", path.display());
        println!("       Create one with: gazecursor init-config");
    }

    Ok(())
}
