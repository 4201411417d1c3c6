// SPDX-License-Identifier: MPL-2.0

//! `UberSmart` controller example.
//!
//! Scans for controllers, prints their status, and optionally writes the
//! switches or the clock.
//!
//! # Usage
//!
//! ```bash
//! # List controllers in range
//! cargo run --example ubersmart_info -- scan
//!
//! # Print the status of one controller as JSON
//! cargo run --example ubersmart_info -- info <address>
//!
//! # Write all four switches (element, pump, holiday, solenoid)
//! cargo run --example ubersmart_info -- switches <address> <8 hex digits>
//!
//! # Set the controller clock to the local time
//! cargo run --example ubersmart_info -- time <address>
//! ```
//!
//! # Examples
//!
//! ```bash
//! cargo run --example ubersmart_info -- info AA:BB:CC:DD:EE:FF
//! cargo run --example ubersmart_info -- switches AA:BB:CC:DD:EE:FF 00000002
//! ```

use std::env;

use ubersolar_lib::UberSmart;
use ubersolar_lib::discovery::{DiscoveryOptions, Scanner};
use ubersolar_lib::subscription::Subscribable;
use ubersolar_lib::transport::BtleplugTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let transport = BtleplugTransport::default_adapter().await?;
    let scanner = Scanner::new(transport.adapter().clone());
    let options = DiscoveryOptions::new();

    if args[1] == "scan" {
        let devices = scanner.discover(&options).await?;
        if devices.is_empty() {
            println!("No controllers found");
        }
        for device in devices {
            println!("{device} rssi={:?}", device.rssi());
        }
        return Ok(());
    }

    let Some(address) = args.get(2) else {
        print_usage(&args[0]);
        std::process::exit(1);
    };
    let Some(info) = scanner.find(address, &options).await? else {
        eprintln!("Controller {address} not found");
        std::process::exit(1);
    };

    let device = UberSmart::builder(transport, info).build();
    device.on_disconnected(|expected| {
        if !expected {
            eprintln!("Link dropped unexpectedly");
        }
    });

    match args[1].as_str() {
        "info" => {}
        "switches" => {
            let Some(switches) = args.get(3) else {
                print_usage(&args[0]);
                std::process::exit(1);
            };
            device.toggle_switches_all(switches).await?;
        }
        "time" => device.set_current_time().await?,
        mode => {
            eprintln!("Unknown mode: {mode}");
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }

    device.update().await?;
    let status = serde_json::Value::Object(device.status().to_map());
    println!("{}", serde_json::to_string_pretty(&status)?);

    device.disconnect().await;
    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {program} scan");
    eprintln!("  {program} info <address>");
    eprintln!("  {program} switches <address> <8 hex digits>");
    eprintln!("  {program} time <address>");
}
