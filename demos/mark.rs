// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Example: embed and detect a watermark from the command line.
//!
//! The embed context is written next to the output as `<output>.ctx.json`
//! and picked up again by `detect`.
use std::fs;

use iprmark_core::{Asset, AssetContext, AssetKind, DetectRequest, HiddenParams, MarkParams, SecretKey, WatermarkEngine};

fn parse_kind(s: &str) -> AssetKind {
    match s {
        "tabular" => AssetKind::Tabular,
        "vector" => AssetKind::Vector,
        "hidden" => AssetKind::RasterHidden,
        other => {
            eprintln!("Unknown kind {other:?} (expected tabular, vector or hidden)");
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 6 {
        eprintln!("Usage: mark embed <kind> <input> <output> <key> [message]");
        eprintln!("       mark detect <kind> <candidate> <original> <key>");
        std::process::exit(1);
    }

    let kind = parse_kind(&args[2]);
    let key = SecretKey::new(args[5].as_bytes().to_vec()).expect("Key must not be empty");
    let mut params = MarkParams::default_for(kind);
    if let (MarkParams::RasterHidden(_), Some(message)) = (&params, args.get(6)) {
        params = MarkParams::RasterHidden(HiddenParams::with_message(message.as_bytes().to_vec()));
    }

    match args[1].as_str() {
        "embed" => {
            let input = fs::read(&args[3]).expect("Could not read input");
            let marked = WatermarkEngine
                .embed(&Asset::new(kind, input), &key, &params)
                .expect("Embed failed");
            fs::write(&args[4], &marked.asset.bytes).expect("Could not write output");
            if let Some(ctx) = &marked.context {
                fs::write(format!("{}.ctx.json", args[4]), ctx.to_json().expect("Could not serialize context")).expect("Could not write context");
            }
            println!("Watermarked asset written to: {}", args[4]);
            println!("Report: {:?}", marked.report);
        }
        "detect" => {
            let candidate = fs::read(&args[3]).expect("Could not read candidate");
            let original = fs::read(&args[4]).ok();
            let mut request = DetectRequest::new(params);
            if let Ok(json) = fs::read_to_string(format!("{}.ctx.json", args[3])) {
                request = request.with_context(AssetContext::from_json(&json).expect("Bad context file"));
            }
            if let Some(original) = original.as_deref() {
                request = request.with_original(original);
            }
            match WatermarkEngine.detect(&Asset::new(kind, candidate), &key, &request) {
                Ok(result) => {
                    println!("Verdict: {:?} (agreement {:.3})", result.verdict, result.agreement);
                    println!("Evidence: {:?}", result.payload);
                }
                Err(e) => eprintln!("Detect failed: {e}"),
            }
        }
        other => {
            eprintln!("Unknown command {other:?}");
            std::process::exit(1);
        }
    }
}
