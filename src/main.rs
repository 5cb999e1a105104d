// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::Path;

fn main() {
    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        if command != "lookup" {
            eprintln!("Usage: lerc [lookup <image>]");
            std::process::exit(2);
        }
        let Some(image_path) = args.next() else {
            eprintln!("Usage: lerc lookup <image>");
            std::process::exit(2);
        };

        let settings = lerc_lib::load_settings();
        match lerc_lib::lookup_image_file(&settings, Path::new(&image_path)) {
            Ok(outcome) => {
                println!("{outcome}");
                return;
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    lerc_lib::run()
}
